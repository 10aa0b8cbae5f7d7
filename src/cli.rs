use clap::Parser;

use crate::config::ProxyConfig;
use crate::target::ConnectTargetMode;

#[derive(Parser, Debug)]
#[command(name = "forward-proxy")]
#[command(author, version, about = "HTTP forward proxy with CONNECT tunneling", long_about = None)]
pub struct Cli {
    /// 监听地址（如 :8081 或 127.0.0.1:3128）
    #[arg(short, long)]
    pub listen: Option<String>,

    /// 配置文件路径（TOML）
    #[arg(short, long)]
    pub config: Option<String>,

    /// CONNECT 目标解析方式 (legacy, authority)
    #[arg(long, value_name = "MODE")]
    pub connect_targets: Option<ConnectTargetMode>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// 只检查配置文件，不启动代理
    #[arg(long, requires = "config")]
    pub check: bool,
}

impl Cli {
    /// 合并配置文件与命令行参数，命令行优先
    pub fn resolve_config(&self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::load(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(mode) = self.connect_targets {
            config.connect_targets = mode;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
