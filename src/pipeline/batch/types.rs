use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::models::DeliveryStop;
use crate::pipeline::extraction::FailureKind;

// ═══════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════

/// Cooperative cancellation flag, checked before each image.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════
// Per-image outcome
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageStatus {
    Extracted { count: usize },
    Failed { kind: FailureKind, message: String },
    /// Not attempted because the batch was cancelled first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageOutcome {
    pub index: usize,
    pub label: String,
    #[serde(flatten)]
    pub status: ImageStatus,
}

// ═══════════════════════════════════════════
// Batch Report (output of BatchOrchestrator)
// ═══════════════════════════════════════════

/// Everything one orchestrator run produced, ready for reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    /// Normalized stops from all successful images, in image order.
    pub stops: Vec<DeliveryStop>,
    pub outcomes: Vec<ImageOutcome>,
    pub attempted: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ImageStatus::Failed { .. }))
    }

    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }
}

// ═══════════════════════════════════════════
// Batch Status Events
// ═══════════════════════════════════════════

/// Observer events. `Progress` is sent before each image is processed,
/// with `current` counting from 1 and ending at `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum BatchStatusEvent {
    Started {
        total: usize,
    },
    Progress {
        current: usize,
        total: usize,
        label: String,
    },
    Completed {
        stops_found: usize,
        failed: usize,
        duration_ms: u64,
    },
    Cancelled {
        processed: usize,
        total: usize,
    },
}
