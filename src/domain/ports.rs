//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the boundary between the instrument registry and the
//! metric storage engine that actually aggregates samples. Adapters implement
//! these traits to provide concrete engines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Registry Layer                          │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │        StorageEngine │ InstrumentSink                │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │        PrometheusEngine │ InMemoryEngine             │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// The four instrument variants.
///
/// They share structure and differ only in how the storage engine
/// aggregates samples: Summary and Histogram build a distribution over
/// observed values, Counter accumulates monotonically, Gauge is a settable
/// value that samples are added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Summary,
    Counter,
    Gauge,
    Histogram,
}

impl InstrumentKind {
    /// All variants, in registry order.
    pub const ALL: [InstrumentKind; 4] = [
        InstrumentKind::Summary,
        InstrumentKind::Counter,
        InstrumentKind::Gauge,
        InstrumentKind::Histogram,
    ];

    /// Whether samples are observed into a distribution (vs. added).
    pub fn is_distribution(&self) -> bool {
        matches!(self, InstrumentKind::Summary | InstrumentKind::Histogram)
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentKind::Summary => write!(f, "summary"),
            InstrumentKind::Counter => write!(f, "counter"),
            InstrumentKind::Gauge => write!(f, "gauge"),
            InstrumentKind::Histogram => write!(f, "histogram"),
        }
    }
}

/// Name, help text and label schema of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentSpec {
    /// Unique name within one instrument kind
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Ordered label names
    pub labels: Vec<String>,
}

impl InstrumentSpec {
    pub fn new<L: AsRef<str>>(
        name: impl Into<String>,
        description: impl Into<String>,
        labels: &[L],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }
}

// =============================================================================
// Storage Engine Port
// =============================================================================

/// Write side of a single instrument inside the storage engine.
///
/// Implementations must be safe for concurrent submission from many
/// request workers at once.
pub trait InstrumentSink: Send + Sync {
    /// Route one sample into the instrument for the given label values.
    ///
    /// Summary and Histogram observe the value, Counter and Gauge add it.
    fn add(&self, value: f64, labels: &[&str]) -> Result<()>;
}

/// Port for the metric storage/export engine.
///
/// The engine performs the actual registration and aggregation; the
/// registry only decides *whether* to create and *where* to route.
pub trait StorageEngine: Send + Sync {
    /// Create and register an instrument, returning its write handle.
    fn create(&self, kind: InstrumentKind, spec: &InstrumentSpec)
        -> Result<Arc<dyn InstrumentSink>>;

    /// Serialize every registered instrument for a pull-based scrape.
    fn render(&self) -> Result<Vec<u8>>;

    /// Content type of [`render`](Self::render) output.
    fn content_type(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_kind_display() {
        assert_eq!(InstrumentKind::Summary.to_string(), "summary");
        assert_eq!(InstrumentKind::Counter.to_string(), "counter");
        assert_eq!(InstrumentKind::Gauge.to_string(), "gauge");
        assert_eq!(InstrumentKind::Histogram.to_string(), "histogram");
    }

    #[test]
    fn test_distribution_kinds() {
        assert!(InstrumentKind::Summary.is_distribution());
        assert!(InstrumentKind::Histogram.is_distribution());
        assert!(!InstrumentKind::Counter.is_distribution());
        assert!(!InstrumentKind::Gauge.is_distribution());
    }

    #[test]
    fn test_instrument_spec_new() {
        let spec = InstrumentSpec::new("requests", "Total requests", &["method", "code"]);
        assert_eq!(spec.name, "requests");
        assert_eq!(spec.description, "Total requests");
        assert_eq!(spec.labels, vec!["method".to_string(), "code".to_string()]);
    }

    #[test]
    fn test_instrument_spec_serializes() {
        let spec = InstrumentSpec::new("up", "", &["name"]);
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"name\":\"up\""));
        assert!(json.contains("\"labels\":[\"name\"]"));
    }
}
