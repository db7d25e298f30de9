//! Serves a router over TCP and talks raw HTTP/1.1 to it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use oxide_dispatch::prelude::*;
use oxide_dispatch::{server, RouterConfig};

async fn start() -> (SocketAddr, oneshot::Sender<()>) {
    start_with(RouterConfig::default()).await
}

async fn start_with(config: RouterConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let mut app = RouterBuilder::with_config(config);
    app.plug(ErrorHandler::new().boxed());
    app.get("/hello/:name", |ctx| {
        Box::pin(async move {
            let body = format!("hello {}", ctx.param("name"));
            ctx.text(200, body);
        })
    })
    .unwrap();
    app.post("/echo", |ctx| {
        Box::pin(async move {
            let body = ctx.request().body.clone();
            let tag = ctx.query("tag").unwrap_or("none").to_string();
            ctx.set_header("X-Tag", tag);
            ctx.bytes(201, "application/octet-stream", &body);
        })
    })
    .unwrap();
    let router = Arc::new(app.build());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server::serve_with_shutdown(listener, router, async {
        let _ = rx.await;
    }));
    (addr, tx)
}

async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn test_get_over_tcp() {
    let (addr, _shutdown) = start().await;
    let response = roundtrip(
        addr,
        "GET /hello/world HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("hello world"), "{response}");
}

#[tokio::test]
async fn test_post_body_and_query() {
    let (addr, _shutdown) = start().await;
    let response = roundtrip(
        addr,
        "POST /echo?tag=a%20b HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\nConnection: close\r\n\r\nping",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 201 Created"), "{response}");
    assert!(response.to_lowercase().contains("x-tag: a b"), "{response}");
    assert!(response.ends_with("ping"), "{response}");
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    let (addr, _shutdown) = start().await;

    let response = roundtrip(
        addr,
        "GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");

    let response = roundtrip(
        addr,
        "DELETE /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 405"), "{response}");
    assert!(response.to_lowercase().contains("allow: post"), "{response}");
}

#[tokio::test]
async fn test_unknown_method_is_not_implemented() {
    let (addr, _shutdown) = start().await;
    let response = roundtrip(
        addr,
        "BREW /hello/tea HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 501"), "{response}");
}

#[tokio::test]
async fn test_method_token_is_case_sensitive() {
    let (addr, _shutdown) = start().await;
    let response = roundtrip(
        addr,
        "get /hello/tea HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 501"), "{response}");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (addr, _shutdown) = start_with(RouterConfig {
        max_body_bytes: 8,
        ..RouterConfig::default()
    })
    .await;

    let response = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413"), "{response}");

    let response = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 8\r\nConnection: close\r\n\r\n01234567",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 201"), "{response}");
}

#[tokio::test]
async fn test_repeated_headers_reach_handler() {
    let mut app = Router::builder();
    app.get("/cookies", |ctx| {
        Box::pin(async move {
            let cookies = ctx.header("Cookie").unwrap_or("").to_string();
            ctx.text(200, cookies);
        })
    })
    .unwrap();
    let router = Arc::new(app.build());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, router));

    let response = roundtrip(
        addr,
        "GET /cookies HTTP/1.1\r\nHost: localhost\r\nCookie: a=1\r\nCookie: b=2\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.ends_with("a=1, b=2"), "{response}");
}
