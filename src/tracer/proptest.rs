//! Property-Based Tests for the Request Tracer
//!
//! # Test Properties
//!
//! 1. **Schema/Tuple Alignment**: for every flag combination the tuple has
//!    exactly as many values as the schema has labels
//! 2. **Fixed Order**: optional labels always follow the base labels in
//!    body, header, time order
//! 3. **Unit Consistency**: every unit is a fixed rescaling of nanoseconds

#![cfg(test)]

use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;

use super::config::{DurationUnit, TracerConfig};
use super::labels::{RequestRecord, BASE_LABELS};

// =============================================================================
// Property Strategies
// =============================================================================

/// Strategy for the three inclusion flags.
fn flags_strategy() -> impl Strategy<Value = (bool, bool, bool)> {
    (any::<bool>(), any::<bool>(), any::<bool>())
}

/// Strategy for unit codes, including unknown ones.
fn unit_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ms".to_string()),
        Just("s".to_string()),
        Just("m".to_string()),
        Just("ns".to_string()),
        "[a-z]{0,4}",
    ]
}

// =============================================================================
// Layout Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tuple_matches_schema(
        (body, header, time) in flags_strategy(),
        url in "/[a-z0-9/]{0,20}",
        status in 100u16..600,
        payload in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let config = TracerConfig {
            include_request_body: body,
            include_request_headers: header,
            include_time: time,
            ..Default::default()
        };
        let layout = config.label_layout();
        let record = RequestRecord::new("GET", url.clone(), status).with_body(payload);
        let tuple = layout.tuple("node", &record, Utc::now(), &config.time_format);
        let schema = layout.schema();

        prop_assert_eq!(tuple.len(), schema.len());
        prop_assert_eq!(&tuple[1], &status.to_string());
        prop_assert_eq!(&tuple[5], &url);
    }

    #[test]
    fn prop_optional_labels_keep_order((body, header, time) in flags_strategy()) {
        let config = TracerConfig {
            include_request_body: body,
            include_request_headers: header,
            include_time: time,
            ..Default::default()
        };
        let schema = config.label_layout().schema();

        prop_assert_eq!(&schema[..BASE_LABELS.len()], &BASE_LABELS[..]);

        let expected: Vec<&str> = [("body", body), ("header", header), ("time", time)]
            .iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect();
        prop_assert_eq!(&schema[BASE_LABELS.len()..], expected.as_slice());
    }
}

// =============================================================================
// Unit Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_unit_is_rescaled_nanos(code in unit_code_strategy(), nanos in 0u64..10_000_000_000_000) {
        let unit = DurationUnit::parse(&code);
        let elapsed = Duration::from_nanos(nanos);
        let divisor = match unit {
            DurationUnit::Nanoseconds => 1.0,
            DurationUnit::Milliseconds => 1_000_000.0,
            DurationUnit::Seconds => 1_000_000_000.0,
            DurationUnit::Minutes => 60_000_000_000.0,
        };

        prop_assert_eq!(unit.convert(elapsed), nanos as f64 / divisor);
    }

    #[test]
    fn prop_unknown_codes_are_milliseconds(code in "[a-z]{3,6}") {
        prop_assert_eq!(DurationUnit::parse(&code), DurationUnit::Milliseconds);
    }
}
