/// 代理模式分发
///
/// CONNECT 请求回复固定的建立隧道应答；其他方法原样重放首次读取的数据到上游
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::request::ParsedRequest;

/// CONNECT 成功后返回给客户端的应答
pub const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// 代理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// 隧道模式，盲转发
    Tunnel,
    /// 普通转发，重放请求
    Forward,
}

impl ProxyMode {
    pub fn for_request(request: &ParsedRequest) -> Self {
        if request.is_connect() {
            Self::Tunnel
        } else {
            Self::Forward
        }
    }
}

/// 执行模式相关的握手，在转发开始前完成
///
/// `raw` 是客户端首次读取到的全部字节
pub async fn handshake<C, U>(
    mode: ProxyMode,
    client: &mut C,
    upstream: &mut U,
    raw: &[u8],
) -> Result<()>
where
    C: AsyncWrite + Unpin,
    U: AsyncWrite + Unpin,
{
    match mode {
        ProxyMode::Tunnel => {
            write_once(client, CONNECT_ESTABLISHED).await?;
            debug!("Tunnel established");
        }
        ProxyMode::Forward => {
            write_once(upstream, raw).await?;
            debug!("Replayed {} request bytes to upstream", raw.len());
        }
    }
    Ok(())
}

async fn write_once<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await.map_err(ProxyError::Handshake)?;
    writer.flush().await.map_err(ProxyError::Handshake)
}
