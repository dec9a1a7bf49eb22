//! Summary instrument for the Prometheus engine
//!
//! The prometheus crate ships counters, gauges and histograms but no
//! summary. This is the objective-less summary: per label tuple it keeps
//! the running sum and count of observations. It is a regular
//! `prometheus::core::Collector`, so it is registered, name-checked and
//! encoded by the crate like every other family.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType, Summary};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
struct SummaryState {
    sum: f64,
    count: u64,
}

type Series = BTreeMap<Vec<String>, SummaryState>;

/// Multi-dimensional summary keyed by label values.
///
/// Clones share the same series.
#[derive(Debug, Clone)]
pub struct SummaryVec {
    desc: Desc,
    series: Arc<Mutex<Series>>,
}

impl SummaryVec {
    /// Fails when the name, help or label names are not valid.
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: Vec<String>) -> Result<Self> {
        let desc = Desc::new(name.into(), help.into(), label_names, HashMap::new())?;
        Ok(Self {
            desc,
            series: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    /// Observe one value for the given label values.
    pub fn observe(&self, value: f64, labels: &[&str]) -> Result<()> {
        if labels.len() != self.desc.variable_labels.len() {
            return Err(Error::LabelCardinality {
                name: self.desc.fq_name.clone(),
                expected: self.desc.variable_labels.len(),
                actual: labels.len(),
            });
        }

        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let mut series = self.series.lock();
        let state = series.entry(key).or_default();
        state.sum += value;
        state.count += 1;
        Ok(())
    }

    /// Sum and count for one label tuple, if it has been observed.
    pub fn get(&self, labels: &[&str]) -> Option<(f64, u64)> {
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        self.series.lock().get(&key).map(|s| (s.sum, s.count))
    }

    fn metric(&self, values: &[String], state: &SummaryState) -> Metric {
        let mut pairs: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        pairs.sort_by(|a, b| a.name().cmp(b.name()));

        let mut summary = Summary::default();
        summary.set_sample_sum(state.sum);
        summary.set_sample_count(state.count);

        let mut metric = Metric::from_label(pairs);
        metric.set_summary(summary);
        metric
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let series = self.series.lock();
        if series.is_empty() {
            return Vec::new();
        }

        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        family.set_metric(
            series
                .iter()
                .map(|(values, state)| self.metric(values, state))
                .collect(),
        );
        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn encode(summary: &SummaryVec) -> String {
        let registry = Registry::new();
        registry.register(Box::new(summary.clone())).unwrap();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_summary_observe_accumulates() {
        let summary = SummaryVec::new("req", "Requests", labels(&["code"])).unwrap();
        summary.observe(1.5, &["200"]).unwrap();
        summary.observe(2.5, &["200"]).unwrap();
        summary.observe(9.0, &["500"]).unwrap();

        assert_eq!(summary.get(&["200"]), Some((4.0, 2)));
        assert_eq!(summary.get(&["500"]), Some((9.0, 1)));
        assert_eq!(summary.get(&["404"]), None);
    }

    #[test]
    fn test_summary_rejects_wrong_cardinality() {
        let summary = SummaryVec::new("req", "Requests", labels(&["code", "method"])).unwrap();
        let err = summary.observe(1.0, &["200"]).unwrap_err();
        assert!(matches!(
            err,
            Error::LabelCardinality {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(matches!(
            SummaryVec::new("bad name", "Bad", vec![]),
            Err(Error::Prometheus(_))
        ));
        assert!(matches!(
            SummaryVec::new("ok_name", "Ok", labels(&["bad-label"])),
            Err(Error::Prometheus(_))
        ));
    }

    #[test]
    fn test_collect_emits_summary_family() {
        let summary = SummaryVec::new("req", "Requests", labels(&["url", "code"])).unwrap();
        summary.observe(3.0, &["/a", "200"]).unwrap();

        let families = summary.collect();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_field_type(), MetricType::SUMMARY);

        let metric = &families[0].get_metric()[0];
        let names: Vec<&str> = metric.get_label().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["code", "url"]);
    }

    #[test]
    fn test_encoded_by_text_encoder() {
        let summary = SummaryVec::new("req", "Request duration", labels(&["url"])).unwrap();
        summary.observe(3.0, &["/a\"b"]).unwrap();

        let text = encode(&summary);
        assert!(text.contains("# HELP req Request duration\n"));
        assert!(text.contains("# TYPE req summary\n"));
        assert!(text.contains("req_sum{url=\"/a\\\"b\"} 3\n"));
        assert!(text.contains("req_count{url=\"/a\\\"b\"} 1\n"));
    }

    #[test]
    fn test_unobserved_summary_is_silent() {
        let summary = SummaryVec::new("idle", "Idle", vec![]).unwrap();
        assert!(summary.collect().is_empty());
        assert!(encode(&summary).is_empty());
    }

    #[test]
    fn test_summary_without_labels() {
        let summary = SummaryVec::new("plain", "Plain", vec![]).unwrap();
        summary.observe(0.25, &[]).unwrap();

        let text = encode(&summary);
        assert!(text.contains("plain_sum 0.25\n"));
        assert!(text.contains("plain_count 1\n"));
    }
}
