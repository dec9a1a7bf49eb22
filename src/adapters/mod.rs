//! Storage Engine Adapters
//!
//! This module contains implementations of the `StorageEngine` port,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Registry                                  │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │          StorageEngine │ InstrumentSink                     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │      PrometheusEngine (+ SummaryVec) │ InMemoryEngine       │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use promwire::adapters::PrometheusEngine;
//! use promwire::Registry;
//!
//! let registry = Registry::new(Arc::new(PrometheusEngine::new()));
//! registry.add_counter("jobs_total", "Jobs processed", &["status"])?;
//! ```

mod memory;
mod prometheus;
mod summary;

pub use self::prometheus::PrometheusEngine;
pub use memory::{InMemoryEngine, SeriesTotal, Submission};
pub use summary::SummaryVec;
