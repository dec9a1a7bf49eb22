//! Label layout for traced requests
//!
//! The summary's label schema and every per-request label tuple come from
//! the same [`LabelLayout`], so the two cannot drift apart:
//!
//! ```text
//! node, code, method, handler, host, url [, body] [, header] [, time]
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::header::HeaderMap;

/// Labels present on every traced request, in order.
pub const BASE_LABELS: [&str; 6] = ["node", "code", "method", "handler", "host", "url"];

/// Optional trailing labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelField {
    Body,
    Header,
    Time,
}

impl LabelField {
    pub fn label_name(&self) -> &'static str {
        match self {
            LabelField::Body => "body",
            LabelField::Header => "header",
            LabelField::Time => "time",
        }
    }
}

// =============================================================================
// Request Record
// =============================================================================

/// What the tracer needs to know about one finished request.
#[derive(Debug, Clone, Default)]
pub struct RequestRecord {
    /// Response status code
    pub status: u16,
    /// Request method
    pub method: String,
    /// Identifier of the handler that served the request
    pub handler: String,
    /// Request `Host` header
    pub host: String,
    /// Request URL (path and query)
    pub url: String,
    /// Raw request body
    pub body: Bytes,
    /// Request headers
    pub headers: HeaderMap,
}

impl RequestRecord {
    pub fn new(method: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status,
            ..Default::default()
        }
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

// =============================================================================
// Label Layout
// =============================================================================

/// Ordered set of labels attached to the request duration summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelLayout {
    optional: Vec<LabelField>,
}

impl LabelLayout {
    pub fn new(optional: Vec<LabelField>) -> Self {
        Self { optional }
    }

    pub fn optional_fields(&self) -> &[LabelField] {
        &self.optional
    }

    /// Number of labels in the schema.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        BASE_LABELS.len() + self.optional.len()
    }

    /// Label names, declared once when the summary is created.
    pub fn schema(&self) -> Vec<String> {
        BASE_LABELS
            .iter()
            .map(|l| l.to_string())
            .chain(self.optional.iter().map(|f| f.label_name().to_string()))
            .collect()
    }

    /// Label values for one request, aligned with [`schema`](Self::schema).
    pub fn tuple(
        &self,
        node: &str,
        record: &RequestRecord,
        now: DateTime<Utc>,
        time_format: &str,
    ) -> Vec<String> {
        let mut values = Vec::with_capacity(self.len());
        values.push(node.to_string());
        values.push(record.status.to_string());
        values.push(record.method.clone());
        values.push(record.handler.clone());
        values.push(record.host.clone());
        values.push(record.url.clone());

        for field in &self.optional {
            let value = match field {
                LabelField::Body => serialize_body(&record.body),
                LabelField::Header => serialize_headers(&record.headers),
                LabelField::Time => now.format(time_format).to_string(),
            };
            values.push(value);
        }

        values
    }
}

/// Serialize a request body as JSON text.
///
/// JSON bodies are re-emitted compactly, anything else becomes a JSON
/// string. An empty body, or a failure, yields an empty label.
pub fn serialize_body(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }

    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_default(),
        Err(_) => serde_json::to_string(&String::from_utf8_lossy(body)).unwrap_or_default(),
    }
}

/// Serialize request headers as a JSON object of name -> values.
pub fn serialize_headers(headers: &HeaderMap) -> String {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    serde_json::to_string(&map).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hyper::header::{HeaderValue, ACCEPT, CONTENT_TYPE};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap()
    }

    fn sample_record() -> RequestRecord {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        RequestRecord::new("POST", "/api/items?x=1", 201)
            .with_handler("create_item")
            .with_host("api.local")
            .with_body(Bytes::from_static(br#"{ "a": 1 }"#))
            .with_headers(headers)
    }

    #[test]
    fn test_base_layout() {
        let layout = LabelLayout::new(vec![]);
        assert_eq!(
            layout.schema(),
            vec!["node", "code", "method", "handler", "host", "url"]
        );

        let tuple = layout.tuple("n1", &sample_record(), fixed_now(), "%Y");
        assert_eq!(
            tuple,
            vec!["n1", "201", "POST", "create_item", "api.local", "/api/items?x=1"]
        );
    }

    #[test]
    fn test_body_and_time() {
        let layout = LabelLayout::new(vec![LabelField::Body, LabelField::Time]);
        let schema = layout.schema();
        let tuple = layout.tuple("n1", &sample_record(), fixed_now(), "%Y-%m-%d %H:%M:%S");

        assert_eq!(schema.len(), 8);
        assert_eq!(schema[6], "body");
        assert_eq!(schema[7], "time");
        assert_eq!(tuple.len(), 8);
        assert_eq!(tuple[6], r#"{"a":1}"#);
        assert_eq!(tuple[7], "2024-03-09 14:05:30");
    }

    #[test]
    fn test_header_inserted_before_time() {
        let layout = LabelLayout::new(vec![LabelField::Body, LabelField::Header, LabelField::Time]);
        let schema = layout.schema();
        let tuple = layout.tuple("n1", &sample_record(), fixed_now(), "%Y");

        assert_eq!(&schema[6..], &["body", "header", "time"]);
        assert_eq!(tuple.len(), 9);
        assert_eq!(tuple[7], r#"{"accept":["*/*"]}"#);
        assert_eq!(tuple[8], "2024");
    }

    #[test]
    fn test_serialize_body_variants() {
        assert_eq!(serialize_body(b""), "");
        assert_eq!(serialize_body(b"[1, 2]"), "[1,2]");
        assert_eq!(serialize_body(b"plain text"), "\"plain text\"");
        assert_eq!(serialize_body(&[0xff, b'a']), "\"\u{fffd}a\"");
    }

    #[test]
    fn test_serialize_headers_groups_values() {
        let mut headers = HeaderMap::new();
        headers.append(ACCEPT, HeaderValue::from_static("text/html"));
        headers.append(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        assert_eq!(
            serialize_headers(&headers),
            r#"{"accept":["text/html","application/json"],"content-type":["text/plain"]}"#
        );
        assert_eq!(serialize_headers(&HeaderMap::new()), "{}");
    }
}
