//! Batch orchestration over a list of manifest screenshots.
//!
//! Images are processed strictly one after another: progress must follow
//! real completion order, and the extraction service is rate-limited per
//! caller. A failing image contributes no stops and never aborts the batch.

pub mod types;
pub mod runner;

pub use types::*;
pub use runner::{run_full_batch, BatchOrchestrator};
