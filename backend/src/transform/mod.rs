//! Transformation module.
//!
//! This module handles the table transform pipeline:
//! - Operations: deduplicate, fill missing, normalize, chart series
//! - Log: the per-run record of applied operations
//! - Pipeline: ordered runs, per-file processing and batches

pub mod log;
pub mod operations;
pub mod pipeline;

pub use log::{Affected, LogRecord, TransformLog};
pub use operations::*;
pub use pipeline::*;
