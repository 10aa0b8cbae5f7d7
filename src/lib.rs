/// HTTP 正向代理库入口
///
/// 将核心模块导出为库，方便测试和复用
pub mod cli;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod relay;
pub mod request;
pub mod server;
pub mod target;

// 重新导出常用类型
pub use config::ProxyConfig;
pub use connection::{handle_connection, Dialer, TcpDialer};
pub use error::{ProxyError, Result};
pub use server::{run_proxy, ProxyServer};
pub use target::ConnectTargetMode;
