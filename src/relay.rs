/// 双向转发
///
/// 两个方向各用一个任务复制数据，等两个方向都结束后才返回，
/// 返回最先出现的错误
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tracing::debug;

/// 数据复制缓冲区大小
const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// 转发方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// a -> b（客户端到上游）
    Outbound,
    /// b -> a（上游到客户端）
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "client -> upstream"),
            Direction::Inbound => write!(f, "upstream -> client"),
        }
    }
}

/// 每个方向复制的字节数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub outbound: u64,
    pub inbound: u64,
}

/// 在 `a` 和 `b` 之间双向复制数据
///
/// 某个方向读到 EOF 后会关闭目标的写端，让对端也看到 EOF。
/// 两个方向都结束后返回；任一方向出错时返回最先出现的错误。
/// 函数返回时两条连接都已被释放。
pub async fn relay<A, B>(a: A, b: B) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    let (done_tx, mut done_rx) = mpsc::channel::<(Direction, io::Result<u64>)>(2);

    spawn_copy(Direction::Outbound, a_read, b_write, done_tx.clone());
    spawn_copy(Direction::Inbound, b_read, a_write, done_tx);

    let mut stats = RelayStats::default();
    let mut first_error = None;

    for _ in 0..2 {
        let (direction, result) = match done_rx.recv().await {
            Some(done) => done,
            // 复制任务异常退出（panic）时发送端被丢弃
            None => {
                if first_error.is_none() {
                    first_error = Some(io::Error::other("relay task aborted"));
                }
                break;
            }
        };

        match result {
            Ok(n) => {
                debug!("Relay {} finished after {} bytes", direction, n);
                match direction {
                    Direction::Outbound => stats.outbound = n,
                    Direction::Inbound => stats.inbound = n,
                }
            }
            Err(e) => {
                debug!("Relay {} failed: {}", direction, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}

fn spawn_copy<R, W>(
    direction: Direction,
    mut reader: ReadHalf<R>,
    mut writer: WriteHalf<W>,
    done_tx: mpsc::Sender<(Direction, io::Result<u64>)>,
) where
    R: AsyncRead + Send + 'static,
    W: AsyncWrite + Send + 'static,
{
    tokio::spawn(async move {
        let result = copy_half(&mut reader, &mut writer).await;
        // 先释放两个半边再通知，保证返回时连接已关闭
        drop(reader);
        drop(writer);
        let _ = done_tx.send((direction, result)).await;
    });
}

/// 单方向复制，读到 EOF 后关闭写端
async fn copy_half<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_copied = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        total_copied += n as u64;
    }

    writer.flush().await?;
    writer.shutdown().await?;
    Ok(total_copied)
}
