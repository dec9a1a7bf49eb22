//! Circuit-breaker observer
//!
//! Mirrors breaker statistics into counters and gauges, one series per
//! breaker name (label `name`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::collector::{CollectorFactory, MetricCollector, MetricResult};
use crate::domain::ports::InstrumentKind;
use crate::error::Result;
use crate::registry::Registry;

/// Default metric name prefix.
pub const DEFAULT_PREFIX: &str = "hystrix_circuit_breaker_";

/// Reserved name; the breaker state is implied by the counters and is
/// never registered or submitted.
pub const CIRCUIT_STATE: &str = "circuit_state";
pub const ATTEMPTS: &str = "attempts";
pub const ERRORS: &str = "errors";
pub const SUCCESSES: &str = "successes";
pub const FAILURES: &str = "failures";
pub const REJECTS: &str = "rejects";
pub const SHORT_CIRCUITS: &str = "short_circuits";
pub const TIMEOUTS: &str = "timeouts";
pub const FALLBACK_SUCCESSES: &str = "fallback_successes";
pub const FALLBACK_FAILURES: &str = "fallback_failures";
pub const CONTEXT_CANCELED: &str = "context_canceled";
pub const CONTEXT_DEADLINE_EXCEEDED: &str = "context_deadline_exceeded";
pub const TOTAL_DURATION: &str = "total_duration";
pub const RUN_DURATION: &str = "run_duration";
pub const CONCURRENCY_IN_USE: &str = "concurrency_in_use";

const BREAKER_LABELS: [&str; 1] = ["name"];

const COUNTERS: [(&str, &str); 11] = [
    (ATTEMPTS, "Number of attempts to run the command"),
    (ERRORS, "Number of failed, rejected, short-circuited or timed out runs"),
    (SUCCESSES, "Number of successful runs"),
    (FAILURES, "Number of runs that returned an error"),
    (REJECTS, "Number of runs rejected by the concurrency limit"),
    (SHORT_CIRCUITS, "Number of runs skipped because the circuit was open"),
    (TIMEOUTS, "Number of runs that timed out"),
    (FALLBACK_SUCCESSES, "Number of successful fallback runs"),
    (FALLBACK_FAILURES, "Number of failed fallback runs"),
    (CONTEXT_CANCELED, "Number of runs whose context was canceled"),
    (CONTEXT_DEADLINE_EXCEEDED, "Number of runs whose context deadline passed"),
];

const GAUGES: [(&str, &str); 3] = [
    (TOTAL_DURATION, "Total command duration in microseconds"),
    (RUN_DURATION, "Run function duration in microseconds"),
    (CONCURRENCY_IN_USE, "Percentage of the concurrency limit in use"),
];

// =============================================================================
// Configuration
// =============================================================================

/// Where the context-canceled count is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextCanceledMode {
    /// Into its own `context_canceled` counter
    #[default]
    Fixed,
    /// Into the `fallback_successes` counter, as older deployments did;
    /// `context_canceled` stays at zero
    Legacy,
}

/// Configuration for the breaker observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Prefix of every metric name
    pub prefix: String,

    /// Routing of the context-canceled count
    pub context_canceled: ContextCanceledMode,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            context_canceled: ContextCanceledMode::Fixed,
        }
    }
}

// =============================================================================
// Metric Names
// =============================================================================

/// Fully-qualified metric names for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    /// Name only; never registered or submitted.
    pub circuit_state: String,
    pub attempts: String,
    pub errors: String,
    pub successes: String,
    pub failures: String,
    pub rejects: String,
    pub short_circuits: String,
    pub timeouts: String,
    pub fallback_successes: String,
    pub fallback_failures: String,
    pub context_canceled: String,
    pub context_deadline_exceeded: String,
    pub total_duration: String,
    pub run_duration: String,
    pub concurrency_in_use: String,
}

impl MetricNames {
    pub fn with_prefix(prefix: &str) -> Self {
        let name = |suffix: &str| format!("{}{}", prefix, suffix);
        Self {
            circuit_state: name(CIRCUIT_STATE),
            attempts: name(ATTEMPTS),
            errors: name(ERRORS),
            successes: name(SUCCESSES),
            failures: name(FAILURES),
            rejects: name(REJECTS),
            short_circuits: name(SHORT_CIRCUITS),
            timeouts: name(TIMEOUTS),
            fallback_successes: name(FALLBACK_SUCCESSES),
            fallback_failures: name(FALLBACK_FAILURES),
            context_canceled: name(CONTEXT_CANCELED),
            context_deadline_exceeded: name(CONTEXT_DEADLINE_EXCEEDED),
            total_duration: name(TOTAL_DURATION),
            run_duration: name(RUN_DURATION),
            concurrency_in_use: name(CONCURRENCY_IN_USE),
        }
    }
}

// =============================================================================
// Observer
// =============================================================================

/// Registers the breaker instruments and hands out per-breaker views.
pub struct BreakerObserver {
    registry: Arc<Registry>,
    config: BreakerConfig,
    names: MetricNames,
}

impl BreakerObserver {
    /// Create an observer and register its counters and gauges.
    pub fn new(registry: Arc<Registry>, config: BreakerConfig) -> Result<Self> {
        for (suffix, help) in COUNTERS {
            registry.add_counter(&format!("{}{}", config.prefix, suffix), help, &BREAKER_LABELS)?;
        }
        for (suffix, help) in GAUGES {
            registry.add_gauge(&format!("{}{}", config.prefix, suffix), help, &BREAKER_LABELS)?;
        }

        info!(
            prefix = %config.prefix,
            mode = ?config.context_canceled,
            "Circuit-breaker observer initialized"
        );

        Ok(Self {
            names: MetricNames::with_prefix(&config.prefix),
            registry,
            config,
        })
    }

    /// Create an observer with the default configuration.
    pub fn with_defaults(registry: Arc<Registry>) -> Result<Self> {
        Self::new(registry, BreakerConfig::default())
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    /// Bind the metric names to one breaker.
    pub fn bind(&self, breaker: &str) -> BreakerView {
        BreakerView {
            registry: Arc::clone(&self.registry),
            breaker: breaker.to_string(),
            mode: self.config.context_canceled,
            names: self.names.clone(),
        }
    }

    /// Collector factory for [`CollectorRegistry::register`](super::CollectorRegistry::register).
    pub fn factory(self: &Arc<Self>) -> CollectorFactory {
        let observer = Arc::clone(self);
        Arc::new(move |breaker: &str| Box::new(observer.bind(breaker)) as Box<dyn MetricCollector>)
    }
}

impl std::fmt::Debug for BreakerObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerObserver")
            .field("config", &self.config)
            .finish()
    }
}

/// Metric names bound to a single breaker.
#[derive(Clone)]
pub struct BreakerView {
    registry: Arc<Registry>,
    breaker: String,
    mode: ContextCanceledMode,
    names: MetricNames,
}

impl BreakerView {
    /// Breaker name used as the `name` label.
    pub fn breaker(&self) -> &str {
        &self.breaker
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    /// The samples a snapshot turns into, in submission order.
    pub fn samples(&self, r: &MetricResult) -> Vec<(InstrumentKind, &str, f64)> {
        let n = &self.names;
        let canceled_target = match self.mode {
            ContextCanceledMode::Fixed => &n.context_canceled,
            ContextCanceledMode::Legacy => &n.fallback_successes,
        };

        let counter = InstrumentKind::Counter;
        let gauge = InstrumentKind::Gauge;
        vec![
            (counter, n.attempts.as_str(), r.attempts),
            (counter, n.errors.as_str(), r.errors),
            (counter, n.successes.as_str(), r.successes),
            (counter, n.failures.as_str(), r.failures),
            (counter, n.rejects.as_str(), r.rejects),
            (counter, n.short_circuits.as_str(), r.short_circuits),
            (counter, n.timeouts.as_str(), r.timeouts),
            (counter, n.fallback_successes.as_str(), r.fallback_successes),
            (counter, n.fallback_failures.as_str(), r.fallback_failures),
            (counter, canceled_target.as_str(), r.context_canceled),
            (
                counter,
                n.context_deadline_exceeded.as_str(),
                r.context_deadline_exceeded,
            ),
            (gauge, n.total_duration.as_str(), r.total_duration.as_micros() as f64),
            (gauge, n.run_duration.as_str(), r.run_duration.as_micros() as f64),
            (gauge, n.concurrency_in_use.as_str(), 100.0 * r.concurrency_in_use),
        ]
    }

    /// Submit one sample per metric for a snapshot.
    pub fn observe(&self, result: &MetricResult) {
        let labels = [self.breaker.as_str()];
        for (kind, name, value) in self.samples(result) {
            if let Err(e) = self.registry.submit(kind, name, value, &labels) {
                warn!(breaker = %self.breaker, metric = %name, error = %e, "Dropping breaker sample");
            }
        }
    }
}

impl MetricCollector for BreakerView {
    fn update(&self, result: &MetricResult) {
        self.observe(result);
    }

    /// Nothing to reset: all state lives in the registry's instruments.
    fn reset(&self) {}
}

impl std::fmt::Debug for BreakerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerView")
            .field("breaker", &self.breaker)
            .field("mode", &self.mode)
            .finish()
    }
}
