use cfd_slices::Field;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::error;

/// Prints the shape and the per-channel statistics of slice dumps
#[derive(Parser)]
struct Cli {
    paths: Vec<PathBuf>,
    #[arg(short, long, default_value_t = 129)]
    resolution: usize,
    #[arg(short, long, default_value_t = 3)]
    channels: usize,
}

fn summarize(path: &Path, channels: usize, resolution: usize) -> cfd_slices::Result<()> {
    let field = Field::load(path, channels, resolution)?;
    println!("{:?}", path);
    println!(
        " shape: ({}, {}, {})",
        field.channels(),
        field.resolution(),
        field.resolution()
    );
    for c in 0..field.channels() {
        match field.stats(c)? {
            Some(stats) => println!(
                " #{c}: [{:.6e}, {:.6e}] mean {:.6e} ({} non finite)",
                stats.min, stats.max, stats.mean, stats.n_non_finite
            ),
            None => println!(" #{c}: no finite value"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    cfd_slices::init_logging();
    let cli = Cli::parse();
    let n_failed = cli
        .paths
        .iter()
        .filter(|path| match summarize(path, cli.channels, cli.resolution) {
            Ok(()) => false,
            Err(e) => {
                error!(?path, "{e}");
                true
            }
        })
        .count();
    if n_failed > 0 {
        anyhow::bail!("{} of {} slices failed", n_failed, cli.paths.len());
    }
    Ok(())
}
