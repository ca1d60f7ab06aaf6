pub mod config;
pub mod core_state;
pub mod export;
pub mod models;
pub mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ExtractionConfig;
use core_state::{CoreState, MergeSummary};
use pipeline::batch::{run_full_batch, BatchOrchestrator, BatchReport, BatchStatusEvent};
use pipeline::extraction::{GeminiClient, ImageSource, VisionExtractor};

/// Install the global tracing subscriber (`RUST_LOG`, else the default filter).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// One CLI invocation: which screenshots, where the export goes, how to call the service.
pub struct RunOptions {
    pub images: Vec<PathBuf>,
    /// Defaults to `config::export_dir()`
    pub out_dir: Option<PathBuf>,
    pub config: ExtractionConfig,
}

pub struct RunOutcome {
    pub report: BatchReport,
    pub merge: MergeSummary,
    pub export_path: PathBuf,
}

/// Extract every image, reconcile into a fresh collection and export it.
pub fn run(
    options: RunOptions,
    progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
) -> anyhow::Result<RunOutcome> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if !options.config.is_configured() {
        anyhow::bail!("No API key configured (set GEMINI_API_KEY)");
    }

    let out_dir = match options.out_dir {
        Some(dir) => dir,
        None => config::export_dir()?,
    };

    let vision = GeminiClient::new(&options.config)?;
    let extractor = VisionExtractor::new(Arc::new(vision));
    let orchestrator = BatchOrchestrator::new(Arc::new(extractor));
    let state = CoreState::new(options.config.sort_policy);

    let images: Vec<ImageSource> = options.images.into_iter().map(ImageSource::Path).collect();
    let (report, merge) = run_full_batch(&orchestrator, &state, &images, progress_fn, None)?;

    let export_path = export::export_to_dir(&state.stops()?, &out_dir)?;

    Ok(RunOutcome {
        report,
        merge,
        export_path,
    })
}
