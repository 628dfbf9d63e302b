//! Integration tests for the portal server.
//!
//! These tests start an actual server on a local port and talk plain
//! HTTP/1.1 to it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use meterstyle_core::DirStore;
use meterstyle_providers::{Heartbeat, SimulatedMeter};
use meterstyle_server::{
    create_router, PageConfig, PortalServer, ServerConfig, ServerError, ServerState,
};

/// Heartbeat that counts its toggles.
struct CountingHeartbeat {
    toggles: Arc<AtomicUsize>,
    on: bool,
}

impl Heartbeat for CountingHeartbeat {
    fn toggle(&mut self) {
        self.on = !self.on;
        self.toggles.fetch_add(1, Ordering::SeqCst);
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

struct TestServer {
    addr: SocketAddr,
    toggles: Arc<AtomicUsize>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
    _dir: tempfile::TempDir,
}

/// Start a test server and return its address and controls.
async fn start_test_server(heartbeat: Duration) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("dark.json"),
        r#"{"name":"Caption","type":"ACText","value":"Good evening"}"#,
    )
    .unwrap();

    let state = ServerState::new(
        PageConfig::default(),
        Box::new(DirStore::new(dir.path())),
        Box::new(SimulatedMeter::new()),
    );
    let toggles = Arc::new(AtomicUsize::new(0));
    let led = CountingHeartbeat {
        toggles: toggles.clone(),
        on: false,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        bind_addr: addr,
        heartbeat,
    };
    let server = PortalServer::new(config, create_router(state), Box::new(led));

    let (shutdown, stop) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop.await;
    }));

    TestServer {
        addr,
        toggles,
        shutdown,
        handle,
        _dir: dir,
    }
}

/// Send one request and return the raw response.
async fn request(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        method, path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("Response timed out")
        .unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn test_page_over_tcp() {
    let server = start_test_server(Duration::from_secs(1)).await;

    let response = request(server.addr, "GET", "/hello?Styles=dark.json").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("Good evening"));
    assert!(response.contains("value=\"dark.json\" checked>"));

    let response = request(server.addr, "GET", "/").await;
    assert!(response.starts_with("HTTP/1.1 302"));
    assert!(response.to_ascii_lowercase().contains("location: /hello"));

    server.shutdown.send(()).unwrap();
    assert!(server.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_telemetry_over_tcp() {
    let server = start_test_server(Duration::from_secs(1)).await;

    let response = request(server.addr, "GET", "/pzem.json").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    let body = response.split("\r\n\r\n").nth(1).unwrap();
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 6);

    let response = request(server.addr, "POST", "/pzem/reset").await;
    assert!(response.starts_with("HTTP/1.1 204"));

    server.shutdown.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_heartbeat_toggles_while_serving() {
    let server = start_test_server(Duration::from_millis(10)).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = request(server.addr, "GET", "/hello").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.shutdown.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
    assert!(server.toggles.load(Ordering::SeqCst) >= 3);

    // No more toggles once the loop has stopped.
    let stopped = server.toggles.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.toggles.load(Ordering::SeqCst), stopped);
}

#[tokio::test]
async fn test_bind_failure() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let state = ServerState::new(
        PageConfig::default(),
        Box::new(meterstyle_core::MemoryDocumentStore::new()),
        Box::new(SimulatedMeter::new()),
    );
    let config = ServerConfig {
        bind_addr: addr,
        heartbeat: Duration::from_secs(1),
    };
    let server = PortalServer::new(
        config,
        create_router(state),
        Box::new(meterstyle_providers::LogHeartbeat::new()),
    );

    let result = server.run_until(std::future::ready(())).await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}
