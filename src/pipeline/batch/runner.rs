//! BatchOrchestrator: one extraction call per image, in order.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::types::*;
use crate::core_state::{CoreError, CoreState, MergeSummary};
use crate::models::DeliveryStop;
use crate::pipeline::extraction::{
    normalize_stops, ExtractionClient, ExtractionError, ImageSource,
};

/// Drives an `ExtractionClient` over a list of images.
pub struct BatchOrchestrator {
    client: Arc<dyn ExtractionClient>,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn ExtractionClient>) -> Self {
        Self { client }
    }

    /// Decode, extract and normalize a single image.
    fn process_image(&self, source: &ImageSource) -> Result<Vec<DeliveryStop>, ExtractionError> {
        let payload = source.load()?;
        let result = self.client.extract(&payload)?;
        Ok(normalize_stops(result.stops))
    }

    /// Run every image through extraction and accumulate the stops.
    ///
    /// Never fails: per-image errors are logged and recorded in the report's
    /// outcomes. With a cancellation token, the flag is checked before each
    /// image; remaining images are recorded as skipped.
    pub fn run(
        &self,
        images: &[ImageSource],
        progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
        cancel: Option<&CancellationToken>,
    ) -> BatchReport {
        let start = Instant::now();
        let total = images.len();
        let emit = |event: BatchStatusEvent| {
            if let Some(progress) = progress_fn {
                progress(event);
            }
        };

        let mut report = BatchReport {
            batch_id: Uuid::new_v4().to_string(),
            stops: Vec::new(),
            outcomes: Vec::with_capacity(total),
            attempted: 0,
            failed: 0,
            cancelled: false,
            duration_ms: 0,
        };

        emit(BatchStatusEvent::Started { total });

        for (index, source) in images.iter().enumerate() {
            let label = source.label();

            if cancel.is_some_and(CancellationToken::is_cancelled) {
                report.cancelled = true;
                report.outcomes.push(ImageOutcome {
                    index,
                    label,
                    status: ImageStatus::Skipped,
                });
                continue;
            }

            emit(BatchStatusEvent::Progress {
                current: index + 1,
                total,
                label: label.clone(),
            });
            report.attempted += 1;

            let status = match self.process_image(source) {
                Ok(stops) => {
                    let count = stops.len();
                    report.stops.extend(stops);
                    ImageStatus::Extracted { count }
                }
                Err(e) => {
                    tracing::warn!(
                        batch_id = %report.batch_id,
                        index,
                        image = %label,
                        kind = ?e.kind(),
                        error = %e,
                        "Image extraction failed, continuing with next image"
                    );
                    report.failed += 1;
                    ImageStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };

            report.outcomes.push(ImageOutcome {
                index,
                label,
                status,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        if report.cancelled {
            tracing::info!(
                batch_id = %report.batch_id,
                processed = report.attempted,
                total,
                "Batch cancelled"
            );
            emit(BatchStatusEvent::Cancelled {
                processed: report.attempted,
                total,
            });
        } else {
            tracing::info!(
                batch_id = %report.batch_id,
                images = total,
                failed = report.failed,
                stops = report.stops.len(),
                duration_ms = report.duration_ms,
                "Batch complete"
            );
            emit(BatchStatusEvent::Completed {
                stops_found: report.stops.len(),
                failed: report.failed,
                duration_ms: report.duration_ms,
            });
        }

        report
    }
}

/// Run a batch and reconcile its stops into the canonical collection.
/// This is the top-level entry point used by the CLI.
pub fn run_full_batch(
    orchestrator: &BatchOrchestrator,
    state: &CoreState,
    images: &[ImageSource],
    progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
    cancel: Option<&CancellationToken>,
) -> Result<(BatchReport, MergeSummary), CoreError> {
    let report = orchestrator.run(images, progress_fn, cancel);
    let summary = state.merge_batch(report.stops.clone())?;
    Ok((report, summary))
}
