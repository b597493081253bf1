//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use vecro_node::config::NodeConfig;
use vecro_node::lifecycle::{spawn_node, RunningNode, ServiceVariant};
use vecro_node::observability::metrics::install_prometheus;
use vecro_node::Shutdown;

/// W3C trace context of an inbound request used across tests.
pub const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
pub const TRACE_ID: &str = "0af7651916cd43dd8448eb211c80319c";
pub const PARENT_SPAN_ID: &str = "b7ad6b7169203331";

/// A raw-TCP peer that answers every request with a fixed status and records
/// the request headers.
#[derive(Clone)]
pub struct MockPeer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    headers: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockPeer {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Headers of every request received, lower-cased names.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.headers.lock().unwrap().clone()
    }
}

/// Start a mock peer on an ephemeral port.
pub async fn start_mock_peer(status: u16) -> MockPeer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let peer = MockPeer {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        headers: Arc::new(Mutex::new(Vec::new())),
    };

    let state = peer.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let state = state.clone();
                    tokio::spawn(handle_request(socket, status, state));
                }
                Err(_) => break,
            }
        }
    });

    peer
}

async fn handle_request(mut socket: TcpStream, status: u16, peer: MockPeer) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let headers: HashMap<String, String> = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    // Recorded before answering so callers observe it once they have a response.
    peer.headers.lock().unwrap().push(headers);
    peer.hits.fetch_add(1, Ordering::SeqCst);

    let body = r#"{"payload":""}"#;
    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Config for a node listening on an ephemeral local port.
pub fn node_config(name: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.node.name = name.to_string();
    config.node.subsystem = name.replace('-', "_");
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.workload.seed = Some(7);
    config
}

/// The process-wide Prometheus recorder of this test binary.
pub fn prometheus() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| install_prometheus().expect("install recorder"))
        .clone()
}

/// Start a base node; it stops when `shutdown` fires.
pub async fn start_node(config: NodeConfig, shutdown: &Shutdown) -> RunningNode {
    spawn_node(config, ServiceVariant::Base, Some(prometheus()), shutdown)
        .await
        .expect("node starts")
}
