//! HTTP/1 server adapter built on hyper.
//!
//! Converts between hyper's types and [`Request`]/[`Response`] and hands each
//! request to [`Router::serve`].

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::HeaderMap;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::request::{Method, Request};
use crate::response::Response;
use crate::router::Router;

/// Binds `addr` and serves `router` until the process exits.
pub async fn run(addr: SocketAddr, router: Arc<Router>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    serve(listener, router).await
}

/// Serves `router` on an already bound listener.
pub async fn serve(listener: TcpListener, router: Arc<Router>) -> std::io::Result<()> {
    serve_with_shutdown(listener, router, std::future::pending()).await
}

/// Serves `router` until `shutdown` resolves. Connections already accepted
/// keep running on their own tasks.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    router: Arc<Router>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    tokio::pin!(shutdown);
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            () = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
        };
        debug!(%peer, "connection accepted");
        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&router)));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%peer, error = %err, "error serving connection");
            }
        });
    }
}

async fn handle(
    req: HyperRequest<Incoming>,
    router: Arc<Router>,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    let Some(method) = Method::parse(req.method().as_str()) else {
        return Ok(into_hyper(Response::new(501).body("501 not implemented")));
    };

    let uri = req.uri();
    let mut request = Request::new(method, uri.path());
    if let Some(query) = uri.query() {
        request.query = Request::parse_query_string(query);
    }
    copy_headers(req.headers(), &mut request.headers);

    let limit = router.config().max_body_bytes;
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(body) => request.body = body.to_bytes().to_vec(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(limit, "request body over limit");
            return Ok(into_hyper(Response::new(413).body("413 payload too large")));
        }
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            return Ok(into_hyper(Response::new(400).body("400 bad request")));
        }
    }

    Ok(into_hyper(router.serve(request).await))
}

/// Repeated headers are joined with `, ` in arrival order. Values that are
/// not visible ASCII are dropped.
fn copy_headers(headers: &HeaderMap, target: &mut HashMap<String, String>) {
    for (key, value) in headers {
        let Ok(value) = value.to_str() else {
            debug!(header = %key, "dropping header with non-ASCII value");
            continue;
        };
        target
            .entry(key.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
}

fn into_hyper(response: Response) -> HyperResponse<Full<Bytes>> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HyperResponse::builder().status(status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|err| {
            warn!(error = %err, "invalid response, answering 500");
            let mut fallback = HyperResponse::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}
