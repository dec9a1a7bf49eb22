//! Prometheus Storage Engine Adapter
//!
//! Implements the `StorageEngine` port on top of the `prometheus` crate.
//! Each engine owns its own `prometheus::Registry`, so several engines can
//! coexist in one process (tests rely on this).

use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

use super::summary::SummaryVec;
use crate::domain::ports::{InstrumentKind, InstrumentSink, InstrumentSpec, StorageEngine};
use crate::error::{Error, Result};

/// Prometheus-backed storage engine.
pub struct PrometheusEngine {
    registry: Registry,
}

impl PrometheusEngine {
    /// Create an engine with a fresh, private registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create an engine on top of an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

}

impl Default for PrometheusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrometheusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusEngine").finish_non_exhaustive()
    }
}

/// The prometheus crate rejects empty help strings.
fn help_text(spec: &InstrumentSpec) -> String {
    if spec.description.is_empty() {
        spec.name.clone()
    } else {
        spec.description.clone()
    }
}

// =============================================================================
// Sinks
// =============================================================================

struct CounterSink {
    name: String,
    vec: CounterVec,
}

impl InstrumentSink for CounterSink {
    fn add(&self, value: f64, labels: &[&str]) -> Result<()> {
        if value < 0.0 {
            return Err(Error::InvalidSample {
                name: self.name.clone(),
                reason: format!("counter cannot decrease (got {})", value),
            });
        }
        self.vec.get_metric_with_label_values(labels)?.inc_by(value);
        Ok(())
    }
}

struct GaugeSink {
    vec: GaugeVec,
}

impl InstrumentSink for GaugeSink {
    fn add(&self, value: f64, labels: &[&str]) -> Result<()> {
        self.vec.get_metric_with_label_values(labels)?.add(value);
        Ok(())
    }
}

struct HistogramSink {
    vec: HistogramVec,
}

impl InstrumentSink for HistogramSink {
    fn add(&self, value: f64, labels: &[&str]) -> Result<()> {
        self.vec.get_metric_with_label_values(labels)?.observe(value);
        Ok(())
    }
}

struct SummarySink {
    summary: SummaryVec,
}

impl InstrumentSink for SummarySink {
    fn add(&self, value: f64, labels: &[&str]) -> Result<()> {
        self.summary.observe(value, labels)
    }
}

// =============================================================================
// StorageEngine
// =============================================================================

impl StorageEngine for PrometheusEngine {
    fn create(
        &self,
        kind: InstrumentKind,
        spec: &InstrumentSpec,
    ) -> Result<Arc<dyn InstrumentSink>> {
        let labels: Vec<&str> = spec.labels.iter().map(String::as_str).collect();

        let sink: Arc<dyn InstrumentSink> = match kind {
            InstrumentKind::Counter => {
                let vec = CounterVec::new(Opts::new(&spec.name, help_text(spec)), &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                Arc::new(CounterSink {
                    name: spec.name.clone(),
                    vec,
                })
            }
            InstrumentKind::Gauge => {
                let vec = GaugeVec::new(Opts::new(&spec.name, help_text(spec)), &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                Arc::new(GaugeSink { vec })
            }
            InstrumentKind::Histogram => {
                let vec =
                    HistogramVec::new(HistogramOpts::new(&spec.name, help_text(spec)), &labels)?;
                self.registry.register(Box::new(vec.clone()))?;
                Arc::new(HistogramSink { vec })
            }
            InstrumentKind::Summary => {
                let summary =
                    SummaryVec::new(spec.name.clone(), help_text(spec), spec.labels.clone())?;
                self.registry.register(Box::new(summary.clone()))?;
                Arc::new(SummarySink { summary })
            }
        };

        debug!(kind = %kind, name = %spec.name, labels = ?spec.labels, "Registered instrument");
        Ok(sink)
    }

    fn render(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(buffer)
    }

    fn content_type(&self) -> &str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn render(engine: &PrometheusEngine) -> String {
        String::from_utf8(engine.render().unwrap()).unwrap()
    }

    #[test]
    fn test_counter_accumulates() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("jobs_total", "Jobs processed", &["status"]);
        let sink = engine.create(InstrumentKind::Counter, &spec).unwrap();

        sink.add(2.0, &["ok"]).unwrap();
        sink.add(3.0, &["ok"]).unwrap();

        let text = render(&engine);
        assert!(text.contains("# TYPE jobs_total counter"));
        assert!(text.contains("jobs_total{status=\"ok\"} 5"));
    }

    #[test]
    fn test_counter_rejects_negative() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("jobs_total", "Jobs processed", &["status"]);
        let sink = engine.create(InstrumentKind::Counter, &spec).unwrap();

        assert_matches!(sink.add(-1.0, &["ok"]), Err(Error::InvalidSample { .. }));
    }

    #[test]
    fn test_gauge_adds() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("in_flight", "In flight", &["pool"]);
        let sink = engine.create(InstrumentKind::Gauge, &spec).unwrap();

        sink.add(4.0, &["a"]).unwrap();
        sink.add(-1.0, &["a"]).unwrap();

        assert!(render(&engine).contains("in_flight{pool=\"a\"} 3"));
    }

    #[test]
    fn test_histogram_observes() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("latency", "Latency", &["route"]);
        let sink = engine.create(InstrumentKind::Histogram, &spec).unwrap();

        sink.add(0.2, &["/"]).unwrap();

        let text = render(&engine);
        assert!(text.contains("# TYPE latency histogram"));
        assert!(text.contains("latency_count{route=\"/\"} 1"));
    }

    #[test]
    fn test_summary_rendered_by_encoder() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("duration", "Duration", &["url"]);
        let sink = engine.create(InstrumentKind::Summary, &spec).unwrap();

        sink.add(1500.0, &["/a"]).unwrap();

        let text = render(&engine);
        assert!(text.contains("# TYPE duration summary"));
        assert!(text.contains("duration_sum{url=\"/a\"} 1500"));
        assert!(text.contains("duration_count{url=\"/a\"} 1"));
    }

    #[test]
    fn test_wrong_cardinality_is_error_not_panic() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("jobs_total", "Jobs", &["status", "queue"]);
        let sink = engine.create(InstrumentKind::Counter, &spec).unwrap();

        assert!(sink.add(1.0, &["ok"]).is_err());
    }

    #[test]
    fn test_duplicate_registration_fails_in_engine() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("dup", "Dup", &["a"]);
        engine.create(InstrumentKind::Counter, &spec).unwrap();

        assert_matches!(
            engine.create(InstrumentKind::Counter, &spec).err(),
            Some(Error::Prometheus(_))
        );

        let other = InstrumentSpec::new("dup_summary", "Dup", &["a"]);
        engine.create(InstrumentKind::Summary, &other).unwrap();
        assert_matches!(
            engine.create(InstrumentKind::Summary, &other).err(),
            Some(Error::Prometheus(prometheus::Error::AlreadyReg))
        );
    }

    #[test]
    fn test_summary_name_clash_with_counter_fails() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("shared", "Shared", &["a"]);
        engine.create(InstrumentKind::Counter, &spec).unwrap();

        assert_matches!(
            engine.create(InstrumentKind::Summary, &spec).err(),
            Some(Error::Prometheus(_))
        );
    }

    #[test]
    fn test_invalid_summary_name_rejected() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("bad name", "Bad", &["a"]);

        assert_matches!(
            engine.create(InstrumentKind::Summary, &spec).err(),
            Some(Error::Prometheus(_))
        );
        assert_eq!(render(&engine), "");
    }

    #[test]
    fn test_summary_sorted_with_other_families() {
        let engine = PrometheusEngine::new();
        let summary = InstrumentSpec::new("aaa_duration", "Duration", &["url"]);
        let counter = InstrumentSpec::new("zzz_total", "Total", &["url"]);
        engine
            .create(InstrumentKind::Counter, &counter)
            .unwrap()
            .add(1.0, &["/"])
            .unwrap();
        engine
            .create(InstrumentKind::Summary, &summary)
            .unwrap()
            .add(2.0, &["/"])
            .unwrap();

        let text = render(&engine);
        let summary_at = text.find("# TYPE aaa_duration summary").unwrap();
        let counter_at = text.find("# TYPE zzz_total counter").unwrap();
        assert!(summary_at < counter_at);
    }

    #[test]
    fn test_empty_help_falls_back_to_name() {
        let engine = PrometheusEngine::new();
        let spec = InstrumentSpec::new("no_help", "", &["name"]);
        let sink = engine.create(InstrumentKind::Gauge, &spec).unwrap();
        sink.add(1.0, &["x"]).unwrap();

        assert!(render(&engine).contains("# HELP no_help no_help"));
    }

    #[test]
    fn test_engines_are_independent() {
        let a = PrometheusEngine::new();
        let b = PrometheusEngine::new();
        let spec = InstrumentSpec::new("shared_name", "Shared", &["x"]);

        a.create(InstrumentKind::Counter, &spec).unwrap();
        b.create(InstrumentKind::Counter, &spec).unwrap();
    }

    #[test]
    fn test_content_type() {
        let engine = PrometheusEngine::new();
        assert!(engine.content_type().starts_with("text/plain"));
    }
}
