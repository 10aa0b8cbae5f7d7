/// Common utilities for integration tests
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use forward_proxy::{ConnectTargetMode, ProxyConfig, ProxyServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Upper bound for any single network step in tests
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Find a port with nothing listening on it
pub fn get_unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to random port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

/// Start the proxy on an ephemeral loopback port
pub async fn start_proxy(connect_targets: ConnectTargetMode) -> (SocketAddr, JoinHandle<()>) {
    let config = ProxyConfig {
        listen: "127.0.0.1:0".to_string(),
        connect_targets,
        ..ProxyConfig::default()
    };
    let server = ProxyServer::bind(&config)
        .await
        .expect("Failed to bind proxy");
    let addr = server.local_addr().expect("Failed to get proxy addr");

    let handle = tokio::spawn(async move {
        server.run().await.ok();
    });

    (addr, handle)
}

/// Create a simple echo server for testing
pub async fn start_echo_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind echo server");
    let addr = listener.local_addr().expect("Failed to get echo addr");

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) => break, // Connection closed
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, handle)
}

/// Start a one-response HTTP server that records what it received
///
/// Reads until the end of the header section, answers with `response` and closes.
pub async fn start_http_server(
    response: &'static [u8],
) -> (SocketAddr, Arc<Mutex<Vec<u8>>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind http server");
    let addr = listener.local_addr().expect("Failed to get http addr");
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(_) => return,
        };

        let mut request = Vec::new();
        let mut buf = vec![0u8; 4096];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        *received_clone.lock().unwrap() = request;

        let _ = socket.write_all(response).await;
        let _ = socket.shutdown().await;
    });

    (addr, received, handle)
}

/// Open a CONNECT tunnel through the proxy and consume the 200 reply
pub async fn open_tunnel(proxy: SocketAddr, target: &str) -> TcpStream {
    let mut stream = TcpStream::connect(proxy)
        .await
        .expect("Failed to connect to proxy");
    stream
        .write_all(format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n\r\n", target, target).as_bytes())
        .await
        .expect("Failed to send CONNECT");

    let mut reply = vec![0u8; forward_proxy::dispatch::CONNECT_ESTABLISHED.len()];
    timeout(STEP_TIMEOUT, stream.read_exact(&mut reply))
        .await
        .expect("Timeout waiting for CONNECT reply")
        .expect("Failed to read CONNECT reply");
    assert_eq!(reply, forward_proxy::dispatch::CONNECT_ESTABLISHED);

    stream
}

/// Read until the peer closes, bounded by `STEP_TIMEOUT`
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    timeout(STEP_TIMEOUT, stream.read_to_end(&mut data))
        .await
        .expect("Timeout waiting for connection close")
        .expect("Failed to read from proxy");
    data
}
