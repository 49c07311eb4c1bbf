//! PBMon Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes a batch of error records → returns the alert text to deliver.

#![warn(clippy::all)]

pub mod alerts;
pub mod markup;

pub use alerts::{AlertDeduplicator, AlertState};
pub use markup::rewrite_markers;
