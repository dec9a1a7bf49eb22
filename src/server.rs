//! Metrics exposition over HTTP
//!
//! A plain hyper accept loop plus the `/metrics` response builder. Routing
//! is left to the caller's service.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Path the exposition endpoint is conventionally mounted on.
pub const METRICS_PATH: &str = "/metrics";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Render the registry into an exposition response.
///
/// Render failures become a 500 with the error text as body.
pub fn metrics_response(registry: &Registry) -> Response<Full<Bytes>> {
    match registry.render() {
        Ok(buffer) => {
            let mut response = Response::new(Full::new(Bytes::from(buffer)));
            let content_type = HeaderValue::from_str(registry.content_type())
                .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));
            response.headers_mut().insert(CONTENT_TYPE, content_type);
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            let mut response = Response::new(Full::new(Bytes::from(e.to_string())));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

/// Plain 404 response.
pub fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"not found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Bind `addr` and serve `service` until the listener fails.
pub async fn serve<S, B>(addr: &str, service: S) -> Result<()>
where
    S: Service<Request<Incoming>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address {}: {}", addr, e)))?;

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    serve_listener(listener, service).await
}

/// Serve connections from an already bound listener.
pub async fn serve_listener<S, B>(listener: TcpListener, service: S) -> Result<()>
where
    S: Service<Request<Incoming>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let service = service.clone();

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(%peer, "Connection error: {}", e);
            }
        });
    }
}
