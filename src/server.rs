/// 监听循环
///
/// 每个接入的连接启动一个独立任务处理，任务之间不共享任何可变状态
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ProxyConfig;
use crate::connection::{handle_connection, Dialer, TcpDialer};
use crate::error::{ProxyError, Result};
use crate::target::ConnectTargetMode;

/// 已绑定监听地址的代理服务
pub struct ProxyServer<D = TcpDialer> {
    listener: TcpListener,
    dialer: Arc<D>,
    connect_targets: ConnectTargetMode,
}

impl ProxyServer<TcpDialer> {
    /// 按配置绑定监听地址
    pub async fn bind(config: &ProxyConfig) -> Result<Self> {
        Self::bind_with_dialer(config, TcpDialer).await
    }
}

impl<D> ProxyServer<D>
where
    D: Dialer + 'static,
{
    pub async fn bind_with_dialer(config: &ProxyConfig, dialer: D) -> Result<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ProxyError::bind(&addr, e))?;

        Ok(Self {
            listener,
            dialer: Arc::new(dialer),
            connect_targets: config.connect_targets,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| ProxyError::bind("local address", e))
    }

    /// 持续接受连接；只有 accept 本身失败时才返回
    pub async fn run(self) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Listening on {}", addr);
        }

        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(|e| {
                error!("Accept error: {}", e);
                ProxyError::Accept(e)
            })?;

            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }

            let dialer = self.dialer.clone();
            let connect_targets = self.connect_targets;

            tokio::spawn(async move {
                let peer = peer_addr.to_string();
                if let Err(e) =
                    handle_connection(stream, &peer, dialer.as_ref(), connect_targets).await
                {
                    error!("Connection from {} aborted: {}", peer, e);
                }
            });
        }
    }
}

/// 绑定并运行代理，直到发生致命错误
pub async fn run_proxy(config: ProxyConfig) -> Result<()> {
    ProxyServer::bind(&config).await?.run().await
}
