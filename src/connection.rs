/// 单个客户端连接的处理流程
///
/// 读取首个请求 -> 解析 -> 计算目标地址 -> 拨号 -> 握手 -> 双向转发
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::dispatch::{handshake, ProxyMode};
use crate::error::{ProxyError, Result};
use crate::relay::relay;
use crate::request::{ParsedRequest, REQUEST_BUFFER_SIZE};
use crate::target::ConnectTargetMode;

/// 上游连接的建立方式
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn dial(&self, addr: &str) -> io::Result<Self::Stream>;
}

/// 直接建立 TCP 连接
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        Ok(stream)
    }
}

/// 处理一个客户端连接
///
/// `client` 和上游连接都由本函数独占，无论从哪条路径返回都会被释放。
/// 转发阶段的错误只记录日志，不作为返回值。
pub async fn handle_connection<C, D>(
    mut client: C,
    peer: &str,
    dialer: &D,
    connect_targets: ConnectTargetMode,
) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer + ?Sized,
{
    let mut buf = [0u8; REQUEST_BUFFER_SIZE];
    let n = client.read(&mut buf).await.map_err(ProxyError::Read)?;
    if n == 0 {
        return Err(ProxyError::EmptyRequest);
    }
    let raw = &buf[..n];

    let request = ParsedRequest::parse(raw);
    let address = connect_targets.resolve(&request)?;

    info!("{} {} (from {})", request.method, request.target, peer);

    let mut upstream = dialer
        .dial(&address)
        .await
        .map_err(|e| ProxyError::connect(&address, e))?;

    let mode = ProxyMode::for_request(&request);
    handshake(mode, &mut client, &mut upstream, raw).await?;

    match relay(client, upstream).await {
        Ok(stats) => debug!(
            "Connection {} -> {} closed ({} bytes out, {} bytes in)",
            peer, address, stats.outbound, stats.inbound
        ),
        Err(e) => warn!("{}", ProxyError::Relay(e)),
    }

    Ok(())
}
