//! PromWire - Prometheus Instrument Registry and Request Tracing
//!
//! A registration facade over a metrics backend: named summaries, counters,
//! gauges and histograms are created once and fed by name, with a hyper
//! interceptor timing HTTP requests and a collector mirroring circuit-breaker
//! statistics.
//!
//! # Architecture
//!
//! ```text
//! TracedService ─┐
//!                ├─▶ Registry ─▶ StorageEngine (Prometheus) ─▶ /metrics
//! BreakerView ───┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Storage engines implementing domain ports
//! - [`breaker`] - Circuit-breaker collector and observer
//! - [`domain`] - Instrument kinds, specs and engine ports
//! - [`error`] - Error types
//! - [`facade`] - Wiring of registry, tracer and observer
//! - [`registry`] - Idempotent name → instrument maps
//! - [`server`] - Metrics exposition over HTTP
//! - [`tracer`] - Request timing interceptor

pub mod adapters;
pub mod breaker;
pub mod domain;
pub mod error;
pub mod facade;
pub mod registry;
pub mod server;
pub mod tracer;

// Re-export commonly used types
pub use adapters::{InMemoryEngine, PrometheusEngine};
pub use breaker::{BreakerConfig, BreakerObserver, CollectorRegistry, MetricCollector, MetricResult};
pub use domain::{InstrumentKind, InstrumentSpec, StorageEngine};
pub use error::{Error, Result};
pub use facade::{PromWire, PromWireConfig};
pub use registry::Registry;
pub use tracer::{HandlerName, RequestTracer, TracedService, TracerConfig};
