//! Request tracer configuration

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::labels::{LabelField, LabelLayout};
use crate::error::{Error, Result};

/// Default summary name.
pub const DEFAULT_METRIC_NAME: &str = "gin_requests_duration";

/// Default summary description.
pub const DEFAULT_METRIC_DESCRIPTION: &str = "The duration of requests";

/// Default timestamp format (UTC).
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// =============================================================================
// Duration Unit
// =============================================================================

/// Unit the elapsed request time is reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DurationUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
    Nanoseconds,
}

impl DurationUnit {
    /// Parse a unit code. Unknown codes fall back to milliseconds.
    pub fn parse(code: &str) -> Self {
        match code {
            "m" => DurationUnit::Minutes,
            "s" => DurationUnit::Seconds,
            "ns" => DurationUnit::Nanoseconds,
            _ => DurationUnit::Milliseconds,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DurationUnit::Milliseconds => "ms",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "m",
            DurationUnit::Nanoseconds => "ns",
        }
    }

    /// Express an elapsed duration in this unit.
    pub fn convert(&self, elapsed: Duration) -> f64 {
        let nanos = elapsed.as_nanos() as f64;
        match self {
            DurationUnit::Minutes => nanos / 60_000_000_000.0,
            DurationUnit::Seconds => nanos / 1_000_000_000.0,
            DurationUnit::Nanoseconds => nanos,
            DurationUnit::Milliseconds => nanos / 1_000_000.0,
        }
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<&str> for DurationUnit {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

impl From<String> for DurationUnit {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<DurationUnit> for String {
    fn from(unit: DurationUnit) -> Self {
        unit.code().to_string()
    }
}

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Configuration for the request tracer.
///
/// Fixed once the tracer is constructed: the label schema of the summary is
/// derived from the `include_*` flags at that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Summary name
    pub metric_name: String,

    /// Summary description
    pub metric_description: String,

    /// Request URLs (exact match) that are never traced
    pub ignore_paths: BTreeSet<String>,

    /// Unit of the recorded duration
    pub duration_unit: DurationUnit,

    /// strftime format of the `time` label
    pub time_format: String,

    /// Append a `time` label
    pub include_time: bool,

    /// Append a `body` label with the serialized request body
    pub include_request_body: bool,

    /// Append a `header` label with the serialized request headers
    pub include_request_headers: bool,

    /// Node identity override; the hostname is used when unset
    pub node_name: Option<String>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            metric_description: DEFAULT_METRIC_DESCRIPTION.to_string(),
            ignore_paths: ["/metrics", "/ping"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            duration_unit: DurationUnit::Milliseconds,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            include_time: false,
            include_request_body: false,
            include_request_headers: false,
            node_name: None,
        }
    }
}

impl TracerConfig {
    /// Optional label fields enabled by this configuration, in label order.
    pub fn optional_fields(&self) -> Vec<LabelField> {
        let mut fields = Vec::new();
        if self.include_request_body {
            fields.push(LabelField::Body);
        }
        if self.include_request_headers {
            fields.push(LabelField::Header);
        }
        if self.include_time {
            fields.push(LabelField::Time);
        }
        fields
    }

    /// Label layout shared by the schema and every per-request tuple.
    pub fn label_layout(&self) -> LabelLayout {
        LabelLayout::new(self.optional_fields())
    }

    /// Whether a request URL is excluded from tracing.
    pub fn is_ignored(&self, url: &str) -> bool {
        self.ignore_paths.contains(url)
    }

    /// Reject configurations that would fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.metric_name.is_empty() {
            return Err(Error::Config("metric name must not be empty".to_string()));
        }

        if self.include_time
            && StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::Config(format!(
                "invalid time format: {:?}",
                self.time_format
            )));
        }

        Ok(())
    }

    /// Node identity: the override if set, otherwise the hostname.
    pub fn resolve_node(&self) -> Result<String> {
        if let Some(name) = &self.node_name {
            return Ok(name.clone());
        }
        let name = hostname::get().map_err(Error::Hostname)?;
        Ok(name.to_string_lossy().into_owned())
    }
}
