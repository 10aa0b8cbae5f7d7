/// 目标地址解析
///
/// 将请求行中的 target 转换为可直接拨号的 `host:port`
use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use crate::error::{ProxyError, Result};
use crate::request::ParsedRequest;

/// 缺省端口
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// 通过 opaque 部分识别的 CONNECT 端口
pub const LEGACY_CONNECT_PORT: &str = "443";

/// CONNECT 目标的解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectTargetMode {
    /// 只通过通用 URI 解析结果推断端口（仅识别 `host:443`）
    #[default]
    Legacy,
    /// 先显式识别 `CONNECT host:port`，失败时回退到 Legacy
    Authority,
}

impl std::str::FromStr for ConnectTargetMode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "authority" => Ok(Self::Authority),
            other => Err(ProxyError::config(format!(
                "unknown connect target mode '{}' (expected legacy or authority)",
                other
            ))),
        }
    }
}

impl ConnectTargetMode {
    /// 根据请求解析拨号地址
    pub fn resolve(self, request: &ParsedRequest) -> Result<String> {
        if self == Self::Authority && request.is_connect() {
            if let Some(address) = authority_address(&request.target) {
                return Ok(address);
            }
        }
        resolve(&request.target)
    }
}

/// 把 target 当作通用 URI 解析并推断拨号地址
///
/// `host:443` 会被 URI 解析器识别为 scheme=`host`、opaque=`443`，
/// 这里据此还原 CONNECT 目标；其余情况取 URI 中原样书写的 host，没有端口时补 `:80`。
/// 注意 `host:8443` 不会被识别，得到的是 `:80`。
/// 相对引用（如 `/index.html`、空字符串）没有 host，同样得到 `:80`。
pub fn resolve(target: &str) -> Result<String> {
    let rest = match Url::parse(target) {
        Ok(url) => {
            let rest = after_scheme(target);
            if rest == LEGACY_CONNECT_PORT {
                return Ok(format!("{}:{}", url.scheme(), LEGACY_CONNECT_PORT));
            }
            rest
        }
        // `http://` 这类 authority 为空的 URI 也视为没有 host
        Err(ParseError::EmptyHost) => after_scheme(target),
        Err(ParseError::RelativeUrlWithoutBase) if is_relative_reference(target) => {
            strip_query(target)
        }
        Err(e) => return Err(ProxyError::invalid_target(target, e)),
    };

    let mut address = authority_host(rest).to_string();
    if !address.contains(':') {
        address.push(':');
        address.push_str(&DEFAULT_HTTP_PORT.to_string());
    }

    Ok(address)
}

/// scheme 之后、query 之前的部分
fn after_scheme(target: &str) -> &str {
    strip_query(target.split_once(':').map(|(_, rest)| rest).unwrap_or_default())
}

/// 去掉 query 和 fragment
fn strip_query(rest: &str) -> &str {
    match rest.find(['?', '#']) {
        Some(i) => &rest[..i],
        None => rest,
    }
}

/// 不以 `:` 开头且第一段路径不含 `:` 的才是合法的相对引用
fn is_relative_reference(target: &str) -> bool {
    let target = strip_query(target);
    let first_segment = target.split('/').next().unwrap_or_default();
    !target.starts_with(':') && !first_segment.contains(':')
}

/// `//[userinfo@]host[:port]/...` 中的 `host[:port]`，端口保持原样
fn authority_host(rest: &str) -> &str {
    let Some(authority) = rest.strip_prefix("//") else {
        return "";
    };
    let authority = authority.split('/').next().unwrap_or_default();
    authority.rsplit('@').next().unwrap_or_default()
}

/// 识别 authority 形式的 `host:port`（不含 scheme 和路径）
fn authority_address(target: &str) -> Option<String> {
    if target.contains('/') {
        return None;
    }
    let (host, port) = target.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    // 未加方括号的 IPv6 地址无法区分端口
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return None;
    }
    Some(target.to_string())
}
