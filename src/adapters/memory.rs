//! In-Memory Storage Engine
//!
//! Implements the `StorageEngine` port without any export backend. Every
//! submission is recorded so tests can assert exactly what producers sent.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::ports::{InstrumentKind, InstrumentSink, InstrumentSpec, StorageEngine};
use crate::error::Result;

/// One recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub kind: InstrumentKind,
    pub name: String,
    pub value: f64,
    pub labels: Vec<String>,
}

/// Accumulated state for one (instrument, label tuple) series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesTotal {
    /// Sum of all submitted values
    pub sum: f64,
    /// Number of submissions
    pub count: u64,
}

#[derive(Debug, Default)]
struct Recorded {
    created: Vec<(InstrumentKind, InstrumentSpec)>,
    submissions: Vec<Submission>,
    totals: BTreeMap<(String, Vec<String>), SeriesTotal>,
}

/// Spy engine that records creations and submissions.
///
/// Cloning is cheap; clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    inner: Arc<RwLock<Recorded>>,
}

impl InMemoryEngine {
    /// Create a new in-memory engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every instrument created so far, in creation order.
    pub fn created(&self) -> Vec<(InstrumentKind, InstrumentSpec)> {
        self.inner.read().created.clone()
    }

    /// Every submission so far, in arrival order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.read().submissions.clone()
    }

    /// Submissions addressed to one instrument name.
    pub fn submissions_for(&self, name: &str) -> Vec<Submission> {
        self.inner
            .read()
            .submissions
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Get the count of recorded submissions.
    pub fn len(&self) -> usize {
        self.inner.read().submissions.len()
    }

    /// Check if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.inner.read().submissions.is_empty()
    }

    /// Accumulated total for one series.
    pub fn total(&self, name: &str, labels: &[&str]) -> SeriesTotal {
        let key = (
            name.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self.inner
            .read()
            .totals
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    /// Drop recorded submissions, keeping created instruments.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.submissions.clear();
        inner.totals.clear();
    }
}

struct RecordingSink {
    kind: InstrumentKind,
    name: String,
    recorded: Arc<RwLock<Recorded>>,
}

impl InstrumentSink for RecordingSink {
    fn add(&self, value: f64, labels: &[&str]) -> Result<()> {
        let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let mut recorded = self.recorded.write();

        let total = recorded
            .totals
            .entry((self.name.clone(), labels.clone()))
            .or_default();
        total.sum += value;
        total.count += 1;

        recorded.submissions.push(Submission {
            kind: self.kind,
            name: self.name.clone(),
            value,
            labels,
        });
        Ok(())
    }
}

impl StorageEngine for InMemoryEngine {
    fn create(
        &self,
        kind: InstrumentKind,
        spec: &InstrumentSpec,
    ) -> Result<Arc<dyn InstrumentSink>> {
        self.inner.write().created.push((kind, spec.clone()));
        Ok(Arc::new(RecordingSink {
            kind,
            name: spec.name.clone(),
            recorded: Arc::clone(&self.inner),
        }))
    }

    fn render(&self) -> Result<Vec<u8>> {
        let inner = self.inner.read();
        let mut out = String::new();
        for ((name, labels), total) in &inner.totals {
            let _ = writeln!(
                out,
                "{}{{{}}} sum={} count={}",
                name,
                labels.join(","),
                total.sum,
                total.count
            );
        }
        Ok(out.into_bytes())
    }

    fn content_type(&self) -> &str {
        "text/plain; charset=utf-8"
    }
}
