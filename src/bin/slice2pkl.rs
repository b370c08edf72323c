use cfd_slices::{config::Config, pipeline};
use clap::Parser;
use std::path::PathBuf;

/// Converts slice dumps into one pickle per channel, NaN above the roof
#[derive(Parser)]
struct Cli {
    paths: Vec<PathBuf>,
    /// YAML case configuration, the reference case is used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    cfd_slices::init_logging();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    let report = pipeline::export_pickles(&config, &cli.paths)?;
    let n_failed = report.iter().filter(|(_, r)| r.is_err()).count();
    if n_failed > 0 {
        anyhow::bail!("{} of {} slices failed", n_failed, report.len());
    }
    Ok(())
}
