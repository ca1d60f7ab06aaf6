//! RouteScan - turn delivery-route screenshots into one ordered stop list.

use std::path::PathBuf;

use clap::Parser;

use routescan_lib::config::ExtractionConfig;
use routescan_lib::pipeline::batch::{BatchStatusEvent, ImageStatus};
use routescan_lib::pipeline::reconcile::SortPolicy;
use routescan_lib::{init_tracing, run, RunOptions};

#[derive(Parser)]
#[command(name = "routescan")]
#[command(about = "Extract delivery stops from route manifest screenshots into a CSV")]
#[command(version)]
struct Cli {
    /// Screenshot files, processed in the order given
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Directory for the CSV export (default: ~/RouteScan/exports)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Vision model to use (overrides ROUTESCAN_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Sort stops with non-numeric labels after numbered ones
    #[arg(long)]
    unparsed_last: bool,
}

fn print_progress(event: BatchStatusEvent) {
    match event {
        BatchStatusEvent::Started { total } => eprintln!("Processing {total} image(s)"),
        BatchStatusEvent::Progress {
            current,
            total,
            label,
        } => eprintln!("[{current}/{total}] {label}"),
        _ => {}
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ExtractionConfig::from_env()?;
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if cli.unparsed_last {
        config = config.with_sort_policy(SortPolicy::UnparsedLast);
    }

    let outcome = run(
        RunOptions {
            images: cli.images,
            out_dir: cli.out,
            config,
        },
        Some(&print_progress),
    )?;

    for image in &outcome.report.outcomes {
        match &image.status {
            ImageStatus::Extracted { count } => {
                println!("  ok      {} ({count} stops)", image.label)
            }
            ImageStatus::Failed { message, .. } => {
                println!("  failed  {}: {message}", image.label)
            }
            ImageStatus::Skipped => println!("  skipped {}", image.label),
        }
    }

    println!(
        "{} stop(s) from {} image(s), {} duplicate(s) merged, {} failed",
        outcome.merge.total,
        outcome.report.attempted,
        outcome.merge.duplicates,
        outcome.report.failed
    );
    println!("Exported to {}", outcome.export_path.display());

    Ok(())
}
