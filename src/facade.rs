//! Wiring of the registry, request tracer and breaker observer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::PrometheusEngine;
use crate::breaker::{BreakerConfig, BreakerObserver, CollectorRegistry};
use crate::error::Result;
use crate::registry::Registry;
use crate::tracer::{RequestTracer, TracedService, TracerConfig};

/// Which parts to enable, as loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromWireConfig {
    /// Request tracing; `None` disables it
    pub tracer: Option<TracerConfig>,

    /// Breaker metrics; `None` disables them
    pub breaker: Option<BreakerConfig>,
}

/// Shared registry plus the optional tracer and breaker observer.
#[derive(Debug, Clone)]
pub struct PromWire {
    registry: Arc<Registry>,
    tracer: Option<Arc<RequestTracer>>,
    observer: Option<Arc<BreakerObserver>>,
}

impl PromWire {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            tracer: None,
            observer: None,
        }
    }

    /// Start from a fresh Prometheus-backed registry.
    pub fn prometheus() -> Self {
        Self::new(Arc::new(Registry::new(Arc::new(PrometheusEngine::new()))))
    }

    /// Build every part enabled in `config` on top of `registry`.
    pub fn from_config(registry: Arc<Registry>, config: &PromWireConfig) -> Result<Self> {
        let mut wire = Self::new(registry);
        if let Some(tracer) = &config.tracer {
            wire = wire.with_tracer(tracer.clone())?;
        }
        if let Some(breaker) = &config.breaker {
            wire = wire.with_breaker(breaker.clone())?;
        }
        Ok(wire)
    }

    /// Enable request tracing.
    pub fn with_tracer(mut self, config: TracerConfig) -> Result<Self> {
        let tracer = RequestTracer::new(Arc::clone(&self.registry), config)?;
        self.tracer = Some(Arc::new(tracer));
        Ok(self)
    }

    /// Enable breaker metrics.
    pub fn with_breaker(mut self, config: BreakerConfig) -> Result<Self> {
        let observer = BreakerObserver::new(Arc::clone(&self.registry), config)?;
        self.observer = Some(Arc::new(observer));
        Ok(self)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn tracer(&self) -> Option<&Arc<RequestTracer>> {
        self.tracer.as_ref()
    }

    pub fn observer(&self) -> Option<&Arc<BreakerObserver>> {
        self.observer.as_ref()
    }

    /// Register the breaker collector factory.
    ///
    /// Returns `false` when breaker metrics are disabled.
    pub fn attach(&self, collectors: &CollectorRegistry) -> bool {
        match &self.observer {
            Some(observer) => {
                collectors.register(observer.factory());
                info!("Breaker metric collector attached");
                true
            }
            None => false,
        }
    }

    /// Wrap a service with the request tracer, if enabled.
    pub fn layer<S>(&self, inner: S) -> TracedService<S> {
        match &self.tracer {
            Some(tracer) => TracedService::new(inner, Arc::clone(tracer)),
            None => TracedService::passthrough(inner),
        }
    }
}
