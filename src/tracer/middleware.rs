//! Request tracer and its hyper interceptor
//!
//! Each request goes through three steps:
//!
//! ```text
//! Start (Instant::now) → Handler Execution (inner service) → Finalize
//! ```
//!
//! Finalize computes the elapsed time, assembles the label tuple and submits
//! one sample to the shared duration summary. Tracing never fails the
//! request: metric delivery errors are logged and dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Either, Full, Limited};
use hyper::body::Body;
use hyper::header::HOST;
use hyper::service::Service;
use hyper::{Request, Response, Uri};
use tracing::{debug, info, warn};

use super::config::TracerConfig;
use super::labels::{LabelLayout, RequestRecord};
use crate::domain::ports::InstrumentKind;
use crate::error::Result;
use crate::registry::Registry;

// =============================================================================
// Request Tracer
// =============================================================================

/// Records one duration sample per finished request.
pub struct RequestTracer {
    registry: Arc<Registry>,
    config: TracerConfig,
    node: String,
    layout: LabelLayout,
}

impl RequestTracer {
    /// Create a tracer and register its summary.
    ///
    /// Fails if the node identity cannot be resolved or the configuration
    /// is invalid.
    pub fn new(registry: Arc<Registry>, config: TracerConfig) -> Result<Self> {
        config.validate()?;
        let node = config.resolve_node()?;
        let layout = config.label_layout();
        let schema = layout.schema();

        registry.add_summary(&config.metric_name, &config.metric_description, &schema)?;

        if let Some(existing) = registry.instrument(InstrumentKind::Summary, &config.metric_name) {
            if existing.labels() != schema.as_slice() {
                warn!(
                    metric = %config.metric_name,
                    existing = ?existing.labels(),
                    wanted = ?schema,
                    "Summary already registered with a different label schema, samples will be dropped"
                );
            }
        }

        info!(
            metric = %config.metric_name,
            node = %node,
            unit = %config.duration_unit,
            labels = ?schema,
            "Request tracer initialized"
        );

        Ok(Self {
            registry,
            config,
            node,
            layout,
        })
    }

    /// Create a tracer with the default configuration.
    pub fn with_defaults(registry: Arc<Registry>) -> Result<Self> {
        Self::new(registry, TracerConfig::default())
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Node identity used as the first label.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn layout(&self) -> &LabelLayout {
        &self.layout
    }

    /// Label values for a finished request.
    pub fn label_values(&self, record: &RequestRecord) -> Vec<String> {
        self.layout
            .tuple(&self.node, record, Utc::now(), &self.config.time_format)
    }

    /// Finalize a request that started at `start`.
    ///
    /// Returns whether a sample was recorded.
    pub fn trace(&self, record: &RequestRecord, start: Instant) -> bool {
        let elapsed = self.config.duration_unit.convert(start.elapsed());
        self.observe(record, elapsed)
    }

    /// Record a request with an already measured duration (in the
    /// configured unit).
    pub fn observe(&self, record: &RequestRecord, elapsed: f64) -> bool {
        if self.config.is_ignored(&record.url) {
            debug!(url = %record.url, "Ignored path, not traced");
            return false;
        }

        let values = self.label_values(record);
        match self.registry.submit(
            InstrumentKind::Summary,
            &self.config.metric_name,
            elapsed,
            &values,
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!(url = %record.url, error = %e, "Dropping request sample");
                false
            }
        }
    }
}

impl std::fmt::Debug for RequestTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracer")
            .field("metric", &self.config.metric_name)
            .field("node", &self.node)
            .field("layout", &self.layout)
            .finish()
    }
}

// =============================================================================
// Interceptor
// =============================================================================

/// Response extension naming the handler that served a request.
///
/// Routers insert it so the tracer can label samples by matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerName(pub String);

impl HandlerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Largest request body buffered for the body label.
pub const MAX_BODY_LABEL_BYTES: usize = 64 * 1024;

/// Request body as seen by the wrapped service.
///
/// `Left` is the buffered copy used for the body label, `Right` the
/// untouched original stream.
pub type TracedBody<B> = Either<Full<Bytes>, B>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// hyper service wrapper that traces every request passing through it.
///
/// The request body is only buffered when the tracer labels it; otherwise
/// it is streamed to the inner service as is. A body that cannot be read,
/// or outgrows [`MAX_BODY_LABEL_BYTES`] while buffering, gets an empty
/// label and the inner service receives an empty body. Bodies known to be
/// larger than the cap up front are never buffered.
#[derive(Clone)]
pub struct TracedService<S> {
    inner: S,
    tracer: Option<Arc<RequestTracer>>,
}

impl<S> TracedService<S> {
    pub fn new(inner: S, tracer: Arc<RequestTracer>) -> Self {
        Self {
            inner,
            tracer: Some(tracer),
        }
    }

    /// Wrap without tracing.
    pub fn passthrough(inner: S) -> Self {
        Self {
            inner,
            tracer: None,
        }
    }

    pub fn tracer(&self) -> Option<&RequestTracer> {
        self.tracer.as_deref()
    }

    fn labels_body(&self) -> bool {
        self.tracer
            .as_ref()
            .is_some_and(|t| t.config().include_request_body)
    }
}

async fn buffer_body<B>(uri: &Uri, body: B) -> Bytes
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, MAX_BODY_LABEL_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(uri = %uri, error = %e, "Request body not labelled");
            Bytes::new()
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TracedService<S>
where
    S: Service<Request<TracedBody<ReqBody>>, Response = Response<ResBody>>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<ReqBody>) -> Self::Future {
        let inner = self.inner.clone();
        let tracer = self.tracer.clone();
        let labels_body = self.labels_body();

        Box::pin(async move {
            let start = Instant::now();
            let (parts, body) = req.into_parts();

            let (body, label) = if !labels_body {
                (Either::Right(body), Bytes::new())
            } else if body.size_hint().lower() > MAX_BODY_LABEL_BYTES as u64 {
                debug!(uri = %parts.uri, "Request body too large to label");
                (Either::Right(body), Bytes::new())
            } else {
                let bytes = buffer_body(&parts.uri, body).await;
                (Either::Left(Full::new(bytes.clone())), bytes)
            };

            let Some(tracer) = tracer else {
                return inner.call(Request::from_parts(parts, body)).await;
            };

            let method = parts.method.to_string();
            let url = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string());
            let host = parts
                .headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
                .or_else(|| parts.uri.authority().map(|a| a.to_string()))
                .unwrap_or_default();
            let headers = parts.headers.clone();

            let response = inner.call(Request::from_parts(parts, body)).await?;

            let handler = response
                .extensions()
                .get::<HandlerName>()
                .map(|h| h.0.clone())
                .unwrap_or_default();

            let record = RequestRecord {
                status: response.status().as_u16(),
                method,
                handler,
                host,
                url,
                body: label,
                headers,
            };
            tracer.trace(&record, start);

            Ok(response)
        })
    }
}
