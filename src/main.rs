//! PromWire demo server
//!
//! Serves a small router behind the request tracer and exposes every
//! registered instrument on `/metrics`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  TcpListener ─▶ TracedService ─▶ router              │
//! │                      │            ├─ /ping           │
//! │                      ▼            ├─ /metrics        │
//! │                  Registry ◀───────┴─ /hello (breaker)│
//! └──────────────────────────────────────────────────────┘
//! ```

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promwire::breaker::{BreakerConfig, CollectorRegistry, ContextCanceledMode, MetricCollector, MetricResult};
use promwire::error::{Error, Result};
use promwire::server::{self, METRICS_PATH};
use promwire::tracer::{DurationUnit, HandlerName, TracedBody, TracerConfig};
use promwire::{PrometheusEngine, PromWire, PromWireConfig, Registry};

// =============================================================================
// CLI Arguments
// =============================================================================

/// PromWire - Prometheus registry with request tracing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: String,

    /// JSON config file; replaces the tracer and breaker flags below
    #[arg(long, env = "PROMWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Disable request tracing
    #[arg(long, env = "DISABLE_TRACER")]
    disable_tracer: bool,

    /// Request duration summary name
    #[arg(long, env = "METRIC_NAME", default_value = promwire::tracer::DEFAULT_METRIC_NAME)]
    metric_name: String,

    /// Request duration summary description
    #[arg(long, env = "METRIC_DESCRIPTION", default_value = promwire::tracer::DEFAULT_METRIC_DESCRIPTION)]
    metric_description: String,

    /// Paths that are never traced
    #[arg(long, env = "IGNORE_PATHS", value_delimiter = ',', default_value = "/metrics,/ping")]
    ignore_paths: Vec<String>,

    /// Duration unit (ms, s, m, ns)
    #[arg(long, env = "DURATION_UNIT", default_value = "ms")]
    duration_unit: String,

    /// strftime format of the time label
    #[arg(long, env = "TIME_FORMAT", default_value = promwire::tracer::DEFAULT_TIME_FORMAT)]
    time_format: String,

    /// Add a time label
    #[arg(long, env = "INCLUDE_TIME")]
    include_time: bool,

    /// Add a body label
    #[arg(long, env = "INCLUDE_REQUEST_BODY")]
    include_request_body: bool,

    /// Add a header label
    #[arg(long, env = "INCLUDE_REQUEST_HEADERS")]
    include_request_headers: bool,

    /// Node label override (defaults to the hostname)
    #[arg(long, env = "NODE_NAME")]
    node_name: Option<String>,

    /// Disable circuit-breaker metrics
    #[arg(long, env = "DISABLE_BREAKER")]
    disable_breaker: bool,

    /// Circuit-breaker metric prefix
    #[arg(long, env = "BREAKER_PREFIX", default_value = promwire::breaker::DEFAULT_PREFIX)]
    breaker_prefix: String,

    /// Count canceled contexts as fallback successes
    #[arg(long, env = "BREAKER_LEGACY_CONTEXT_CANCELED")]
    breaker_legacy_context_canceled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn wire_config(&self) -> Result<PromWireConfig> {
        if let Some(path) = &self.config {
            let raw = std::fs::read_to_string(path)?;
            let config = serde_json::from_str(&raw).map_err(|e| {
                Error::Config(format!("Invalid config file {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Ok(config);
        }

        let tracer = (!self.disable_tracer).then(|| TracerConfig {
            metric_name: self.metric_name.clone(),
            metric_description: self.metric_description.clone(),
            ignore_paths: self.ignore_paths.iter().cloned().collect(),
            duration_unit: DurationUnit::parse(&self.duration_unit),
            time_format: self.time_format.clone(),
            include_time: self.include_time,
            include_request_body: self.include_request_body,
            include_request_headers: self.include_request_headers,
            node_name: self.node_name.clone(),
        });

        let breaker = (!self.disable_breaker).then(|| BreakerConfig {
            prefix: self.breaker_prefix.clone(),
            context_canceled: if self.breaker_legacy_context_canceled {
                ContextCanceledMode::Legacy
            } else {
                ContextCanceledMode::Fixed
            },
        });

        Ok(PromWireConfig { tracer, breaker })
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting PromWire");

    let config = args.wire_config()?;
    let registry = Arc::new(Registry::new(Arc::new(PrometheusEngine::new())));
    let wire = PromWire::from_config(registry, &config).map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    info!("  Tracer enabled: {}", wire.tracer().is_some());
    info!("  Breaker metrics enabled: {}", wire.observer().is_some());

    let collectors = CollectorRegistry::new();
    wire.attach(&collectors);

    let state = Arc::new(Demo {
        wire: wire.clone(),
        hello_breaker: collectors.initialize_collectors("hello"),
    });

    let router = service_fn(move |req: Request<TracedBody<Incoming>>| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Infallible>(state.route(&req)) }
    });

    server::serve(&args.listen_addr, wire.layer(router)).await?;

    info!("PromWire shutdown complete");
    Ok(())
}

// =============================================================================
// Demo Router
// =============================================================================

struct Demo {
    wire: PromWire,
    hello_breaker: Vec<Box<dyn MetricCollector>>,
}

impl Demo {
    fn route<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let (handler, mut response) = match req.uri().path() {
            "/ping" => ("ping", Response::new(Full::new(Bytes::from_static(b"pong")))),
            METRICS_PATH => ("metrics", server::metrics_response(self.wire.registry())),
            "/hello" => ("hello", self.hello()),
            _ => return server::not_found(),
        };
        response.extensions_mut().insert(HandlerName::new(handler));
        response
    }

    fn hello(&self) -> Response<Full<Bytes>> {
        let start = Instant::now();
        let response = Response::new(Full::new(Bytes::from_static(b"hello")));

        let elapsed = start.elapsed();
        let result = MetricResult {
            attempts: 1.0,
            successes: 1.0,
            total_duration: elapsed,
            run_duration: elapsed,
            ..Default::default()
        };
        for collector in &self.hello_breaker {
            collector.update(&result);
        }
        response
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn", level.as_str().to_lowercase())));

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
