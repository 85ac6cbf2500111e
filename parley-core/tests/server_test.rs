//! Integration tests for the parley-core server loop

use parley_core::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn spawn_server(max_body_bytes: usize) -> (std::net::SocketAddr, oneshot::Sender<()>) {
    let mut router = Router::new();
    router.post("/echo", |req| async move { Ok(HttpResponse::ok().with_body(req.body)) });
    router.get("/health", |_req| async {
        HttpResponse::ok().with_json(&serde_json::json!({"status": "ok"}))
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = Server::new(
        router,
        ServerConfig::new("127.0.0.1", addr.port()).with_max_body_bytes(max_body_bytes),
    );
    tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr, tx)
}

async fn raw_request(addr: std::net::SocketAddr, request: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    )
}

#[tokio::test]
async fn test_round_trip_over_tcp() {
    let (addr, _shutdown) = spawn_server(1024).await;

    let response = raw_request(addr, post("/echo", r#"{"hello":"world"}"#)).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.ends_with(r#"{"hello":"world"}"#));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (addr, _shutdown) = spawn_server(16).await;

    let body = "x".repeat(100);
    let response = raw_request(addr, post("/echo", &body)).await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);
}

#[tokio::test]
async fn test_unknown_route_over_tcp() {
    let (addr, _shutdown) = spawn_server(1024).await;

    let response = raw_request(
        addr,
        "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n".to_string(),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 404"), "{}", response);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (addr, shutdown) = spawn_server(1024).await;
    shutdown.send(()).unwrap();

    // give the accept loop a moment to observe the signal
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(TcpStream::connect(addr).await.is_err());
}
