use cfd_slices::{config::Config, pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Profiles, masked slices and flux comparison of a greenhouse case
#[derive(Parser)]
struct Cli {
    /// YAML case configuration, the reference case is used if omitted
    config: Option<PathBuf>,
    /// Overrides the output directory of the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    cfd_slices::init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    let now = Instant::now();
    let renderer = config.image;
    let report = pipeline::run(&config, &renderer)?;
    info!("post-processing in {}ms", now.elapsed().as_millis());

    if !report.is_success() {
        anyhow::bail!("{} of {} units failed", report.n_failed(), report.n_unit());
    }
    Ok(())
}
