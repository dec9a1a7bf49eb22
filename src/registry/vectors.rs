//! Instrument Registry
//!
//! Four independent name -> instrument maps (summary, counter, gauge,
//! histogram). Creation is idempotent per name within a kind, and samples
//! are routed by name, so independent producers can share one namespace
//! without coordinating on creation order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::domain::ports::{InstrumentKind, InstrumentSink, InstrumentSpec, StorageEngine};
use crate::error::{Error, Result};

// =============================================================================
// Instrument
// =============================================================================

/// A registered instrument: its declared schema plus the engine handle.
#[derive(Clone)]
pub struct Instrument {
    kind: InstrumentKind,
    spec: InstrumentSpec,
    sink: Arc<dyn InstrumentSink>,
}

impl Instrument {
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// Declared label schema.
    pub fn labels(&self) -> &[String] {
        &self.spec.labels
    }

    pub fn spec(&self) -> &InstrumentSpec {
        &self.spec
    }

    /// Submit one sample. The tuple must match the label schema in length.
    pub fn add_metric<S: AsRef<str>>(&self, value: f64, label_values: &[S]) -> Result<()> {
        if label_values.len() != self.spec.labels.len() {
            return Err(Error::LabelCardinality {
                name: self.spec.name.clone(),
                expected: self.spec.labels.len(),
                actual: label_values.len(),
            });
        }

        let values: Vec<&str> = label_values.iter().map(AsRef::as_ref).collect();
        self.sink.add(value, &values)
    }
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("kind", &self.kind)
            .field("name", &self.spec.name)
            .field("labels", &self.spec.labels)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

type InstrumentMap = RwLock<HashMap<String, Instrument>>;

/// Owner of every instrument, shared by all producers.
///
/// Construct once and pass an `Arc<Registry>` to each producer.
pub struct Registry {
    engine: Arc<dyn StorageEngine>,
    summaries: InstrumentMap,
    counters: InstrumentMap,
    gauges: InstrumentMap,
    histograms: InstrumentMap,
}

impl Registry {
    /// Create an empty registry on top of a storage engine.
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            summaries: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    fn map(&self, kind: InstrumentKind) -> &InstrumentMap {
        match kind {
            InstrumentKind::Summary => &self.summaries,
            InstrumentKind::Counter => &self.counters,
            InstrumentKind::Gauge => &self.gauges,
            InstrumentKind::Histogram => &self.histograms,
        }
    }

    /// Create an instrument unless one with this name already exists.
    ///
    /// A second call with the same name is a no-op: the first description
    /// and label schema are kept and the new ones are not compared.
    #[instrument(skip(self, description, labels))]
    pub fn add<L: AsRef<str>>(
        &self,
        kind: InstrumentKind,
        name: &str,
        description: &str,
        labels: &[L],
    ) -> Result<()> {
        let mut map = self.map(kind).write();
        if map.contains_key(name) {
            debug!("Instrument already registered, keeping existing schema");
            return Ok(());
        }

        let spec = InstrumentSpec::new(name, description, labels);
        let sink = self.engine.create(kind, &spec)?;
        map.insert(name.to_string(), Instrument { kind, spec, sink });
        Ok(())
    }

    pub fn add_summary<L: AsRef<str>>(&self, name: &str, description: &str, labels: &[L]) -> Result<()> {
        self.add(InstrumentKind::Summary, name, description, labels)
    }

    pub fn add_counter<L: AsRef<str>>(&self, name: &str, description: &str, labels: &[L]) -> Result<()> {
        self.add(InstrumentKind::Counter, name, description, labels)
    }

    pub fn add_gauge<L: AsRef<str>>(&self, name: &str, description: &str, labels: &[L]) -> Result<()> {
        self.add(InstrumentKind::Gauge, name, description, labels)
    }

    pub fn add_histogram<L: AsRef<str>>(
        &self,
        name: &str,
        description: &str,
        labels: &[L],
    ) -> Result<()> {
        self.add(InstrumentKind::Histogram, name, description, labels)
    }

    /// Look up an instrument by kind and name.
    pub fn instrument(&self, kind: InstrumentKind, name: &str) -> Option<Instrument> {
        self.map(kind).read().get(name).cloned()
    }

    /// Check if an instrument exists.
    pub fn contains(&self, kind: InstrumentKind, name: &str) -> bool {
        self.map(kind).read().contains_key(name)
    }

    /// Names registered under one kind, sorted.
    pub fn names(&self, kind: InstrumentKind) -> Vec<String> {
        let mut names: Vec<String> = self.map(kind).read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Route a sample to a named instrument.
    ///
    /// The map lock is held only for the lookup; the engine is called after
    /// it is released.
    pub fn submit<S: AsRef<str>>(
        &self,
        kind: InstrumentKind,
        name: &str,
        value: f64,
        label_values: &[S],
    ) -> Result<()> {
        let instrument = self
            .instrument(kind, name)
            .ok_or_else(|| Error::InstrumentNotRegistered {
                kind,
                name: name.to_string(),
            })?;
        instrument.add_metric(value, label_values)
    }

    /// Serialize every instrument through the storage engine.
    pub fn render(&self) -> Result<Vec<u8>> {
        self.engine.render()
    }

    /// Content type of the exposition format.
    pub fn content_type(&self) -> &str {
        self.engine.content_type()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("summaries", &self.summaries.read().len())
            .field("counters", &self.counters.read().len())
            .field("gauges", &self.gauges.read().len())
            .field("histograms", &self.histograms.read().len())
            .finish()
    }
}
