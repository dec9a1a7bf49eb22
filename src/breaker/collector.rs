//! Circuit-breaker collector contract
//!
//! The breaker library reports one [`MetricResult`] per evaluation cycle to
//! every collector it created for a breaker name. Collectors come from
//! factories registered on a [`CollectorRegistry`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Statistics of one breaker evaluation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricResult {
    pub attempts: f64,
    pub errors: f64,
    pub successes: f64,
    pub failures: f64,
    pub rejects: f64,
    pub short_circuits: f64,
    pub timeouts: f64,
    pub fallback_successes: f64,
    pub fallback_failures: f64,
    pub context_canceled: f64,
    pub context_deadline_exceeded: f64,
    pub total_duration: Duration,
    pub run_duration: Duration,
    /// Fraction of the concurrency limit in use (0.0 - 1.0)
    pub concurrency_in_use: f64,
}

/// Receives breaker statistics for one breaker name.
pub trait MetricCollector: Send + Sync {
    /// Called after each evaluation cycle.
    fn update(&self, result: &MetricResult);

    /// Called when the breaker is reset.
    fn reset(&self);
}

/// Factory producing a collector for a breaker name.
pub type CollectorFactory = Arc<dyn Fn(&str) -> Box<dyn MetricCollector> + Send + Sync>;

/// Registry of collector factories, consulted once per breaker name.
#[derive(Default)]
pub struct CollectorRegistry {
    factories: RwLock<Vec<CollectorFactory>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector factory.
    pub fn register(&self, factory: CollectorFactory) {
        self.factories.write().push(factory);
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Build one collector per registered factory for a breaker name.
    pub fn initialize_collectors(&self, name: &str) -> Vec<Box<dyn MetricCollector>> {
        self.factories
            .read()
            .iter()
            .map(|factory| factory(name))
            .collect()
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("factories", &self.len())
            .finish()
    }
}
