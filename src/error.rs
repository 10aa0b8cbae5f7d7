/// 自定义错误类型
///
/// 每个连接的错误都在连接处理边界上被记录，不会扩散到其他连接
use std::io;
use thiserror::Error;

/// 代理的主要错误类型
#[derive(Error, Debug)]
pub enum ProxyError {
    /// 监听地址绑定失败
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// accept 失败
    #[error("Accept error: {0}")]
    Accept(#[source] io::Error),

    /// 读取客户端首个请求失败
    #[error("Failed to read request: {0}")]
    Read(#[source] io::Error),

    /// 客户端在发送任何数据前关闭了连接
    #[error("Client closed the connection before sending a request")]
    EmptyRequest,

    /// 目标无法解析为 URI
    #[error("Invalid target '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    /// 连接上游失败
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// CONNECT 应答或请求重放写入失败
    #[error("Handshake write failed: {0}")]
    Handshake(#[source] io::Error),

    /// 双向转发出错
    #[error("Relay error: {0}")]
    Relay(#[source] io::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    pub fn invalid_target(target: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            source,
        }
    }

    pub fn connect(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            addr: addr.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// 是否为目标解析错误
    pub fn is_invalid_target(&self) -> bool {
        matches!(self, Self::InvalidTarget { .. })
    }

    /// 是否为上游连接错误
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// 是否属于进程级（致命）错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Accept(_))
    }
}
