/// 配置管理
///
/// 代理配置可以来自 TOML 文件，命令行参数优先
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::target::ConnectTargetMode;

/// 缺省监听地址
pub const DEFAULT_LISTEN: &str = ":8081";

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 监听地址，`:port` 表示所有网卡
    #[serde(default = "default_listen")]
    pub listen: String,
    /// CONNECT 目标的解析方式（legacy 或 authority）
    #[serde(default)]
    pub connect_targets: ConnectTargetMode,
    /// 日志级别 (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            connect_targets: ConnectTargetMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl ProxyConfig {
    /// 从 TOML 文件加载配置（`[proxy]` 表）
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct ProxyConfigWrapper {
            #[serde(default)]
            proxy: ProxyConfig,
        }

        let wrapper: ProxyConfigWrapper =
            toml::from_str(content).context("Failed to parse proxy configuration")?;
        wrapper
            .proxy
            .validate()
            .context("Proxy configuration validation failed")?;
        Ok(wrapper.proxy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen.trim().is_empty() {
            bail!("listen address cannot be empty");
        }

        let port = match self.listen.rsplit_once(':') {
            Some((_, port)) => port,
            None => bail!("listen address '{}' is missing a port", self.listen),
        };
        if port.parse::<u16>().is_err() {
            bail!("listen address '{}' has an invalid port", self.listen);
        }

        if !matches!(
            self.log_level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            bail!("unknown log level '{}'", self.log_level);
        }

        Ok(())
    }

    /// 可直接传给 `TcpListener::bind` 的地址
    pub fn listen_addr(&self) -> String {
        if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        }
    }
}
