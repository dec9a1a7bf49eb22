//! Registry module
//!
//! Owns every instrument and routes samples to them by name.

mod vectors;

pub use vectors::{Instrument, Registry};
