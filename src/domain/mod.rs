//! Domain Layer
//!
//! Abstractions the registry depends on.
//!
//! - **Ports** (`ports.rs`) - the storage-engine boundary and instrument
//!   value objects
//!
//! # Usage
//!
//! ```ignore
//! use promwire::domain::ports::{InstrumentKind, InstrumentSpec, StorageEngine};
//!
//! fn register<E: StorageEngine>(engine: &E) -> promwire::Result<()> {
//!     let spec = InstrumentSpec::new("jobs_total", "Jobs processed", &["status"]);
//!     let sink = engine.create(InstrumentKind::Counter, &spec)?;
//!     sink.add(1.0, &["ok"])
//! }
//! ```

pub mod ports;

pub use ports::{InstrumentKind, InstrumentSink, InstrumentSpec, StorageEngine};
