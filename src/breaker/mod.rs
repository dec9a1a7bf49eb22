//! Circuit-Breaker Metrics
//!
//! Collects breaker statistics into the registry.
//!
//! # Metrics
//!
//! All metrics carry a single `name` label (the breaker name) and share a
//! configurable prefix (default `hystrix_circuit_breaker_`).
//!
//! | Suffix | Type | Value |
//! |--------|------|-------|
//! | `attempts` .. `context_deadline_exceeded` | Counter | count from the snapshot |
//! | `total_duration` | Gauge | microseconds, truncated |
//! | `run_duration` | Gauge | microseconds, truncated |
//! | `concurrency_in_use` | Gauge | fraction x 100 |
//!
//! Every snapshot makes 14 submissions. In the default `Fixed` mode they hit
//! 14 distinct instruments; in `Legacy` mode the canceled-context count goes
//! to `fallback_successes` as well, so only 13 distinct instruments move and
//! `context_canceled` receives nothing.
//!
//! # Usage
//!
//! ```ignore
//! let observer = Arc::new(BreakerObserver::with_defaults(registry)?);
//! let collectors = CollectorRegistry::new();
//! collectors.register(observer.factory());
//! ```

mod collector;
mod observer;

pub use collector::{CollectorFactory, CollectorRegistry, MetricCollector, MetricResult};
pub use observer::{
    BreakerConfig, BreakerObserver, BreakerView, ContextCanceledMode, MetricNames, DEFAULT_PREFIX,
};
