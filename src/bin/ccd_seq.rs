use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ccdcam::{
    geometry::CandidateRect,
    sequence::{write_csv, SequenceAnalyser},
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Apply the same ROI analysis to every image in a directory.
#[derive(Parser, Debug)]
#[command(name = "ccd_seq")]
#[command(about = "Analyse a directory of CCD images and write the results as CSV")]
struct Args {
    /// Directory containing the images to be processed
    #[arg(long)]
    in_dir: PathBuf,

    /// Output CSV file (defaults to stdout)
    #[arg(long)]
    out_file: Option<PathBuf>,

    /// Region of interest as x,y:w,h (defaults to the whole image)
    #[arg(long)]
    roi: Option<String>,

    /// Width of the X profile window in rows
    #[arg(long, default_value_t = 1)]
    x_width: u32,

    /// Width of the Y profile window in columns
    #[arg(long, default_value_t = 1)]
    y_width: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("ccdcam={},ccd_seq={}", level, level)))
        .with_writer(io::stderr)
        .init();

    let roi = args
        .roi
        .as_deref()
        .map(|value| CandidateRect::parse("roi", value))
        .transpose()?;

    let analyser = SequenceAnalyser::new(roi, args.x_width, args.y_width);
    let rows = analyser
        .analyse_dir(&args.in_dir)
        .await
        .with_context(|| format!("Failed to analyse {}", args.in_dir.display()))?;

    match &args.out_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(&rows, file)?;
            info!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => write_csv(&rows, io::stdout().lock())?,
    }

    Ok(())
}
