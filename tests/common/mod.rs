//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use arc_swap::ArcSwap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use vhost_proxy::config::loader::parse_config;
use vhost_proxy::http::HttpServer;
use vhost_proxy::lifecycle::Shutdown;
use vhost_proxy::routing::{HookRegistry, RoutingTable};

/// Read a request head (up to the blank line) from `socket`.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a mock backend that answers every request with its own request head.
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    head.len(),
                    head
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a mock backend that sends a fixed raw response.
pub async fn start_raw_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// A proxy running in the background.
pub struct RunningProxy {
    pub server: HttpServer,
    pub shutdown: Shutdown,
}

/// Start the proxy on `addr` with the given TOML configuration.
pub async fn start_proxy(addr: SocketAddr, config: &str) -> RunningProxy {
    start_proxy_with_hooks(addr, config, &HookRegistry::new()).await
}

/// Start the proxy with hooks registered in code.
pub async fn start_proxy_with_hooks(addr: SocketAddr, config: &str, registry: &HookRegistry) -> RunningProxy {
    let config = parse_config(config).unwrap();
    let table = RoutingTable::compile(&config.vhosts, config.hook_policy, registry).unwrap();
    let server = HttpServer::new(Arc::new(ArcSwap::from_pointee(table)), &config);

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(server.clone().run(listener, shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    RunningProxy { server, shutdown }
}

/// HTTP client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
