//! Request Tracer
//!
//! Times HTTP requests and records one sample per request into a single
//! duration summary (default `gin_requests_duration`).
//!
//! # Labels
//!
//! | Label | Source | When |
//! |-------|--------|------|
//! | `node` | hostname (or override) | always |
//! | `code` | response status | always |
//! | `method` | request method | always |
//! | `handler` | [`HandlerName`] response extension | always |
//! | `host` | `Host` header | always |
//! | `url` | path and query | always |
//! | `body` | request body as JSON | `include_request_body` |
//! | `header` | request headers as JSON | `include_request_headers` |
//! | `time` | UTC timestamp, `time_format` | `include_time` |
//!
//! Requests whose URL is in `ignore_paths` (default `/metrics`, `/ping`)
//! are not recorded.

mod config;
mod labels;
mod middleware;

pub use config::{
    DurationUnit, TracerConfig, DEFAULT_METRIC_DESCRIPTION, DEFAULT_METRIC_NAME,
    DEFAULT_TIME_FORMAT,
};
pub use labels::{serialize_body, serialize_headers, LabelField, LabelLayout, RequestRecord, BASE_LABELS};
pub use middleware::{HandlerName, RequestTracer, TracedBody, TracedService, MAX_BODY_LABEL_BYTES};

#[cfg(test)]
mod proptest;
