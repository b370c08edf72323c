use std::path::PathBuf;

mod source;
mod field;
pub use field::{ChannelStats, Field};
mod domain;
pub use domain::Domain;
mod roof;
pub use roof::{build_mask, Mask, Roof};
mod slice;
pub use slice::{apply_mask, extract_profile, ContourLevels, Profile};
mod series;
pub use series::{load_series, TimeSeries};
mod analytic;
pub use analytic::GaussianBump;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod render;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "failed to decode {path:?}: expected {expected} bytes ({channels}x{resolution}x{resolution} f64), found {actual}"
    )]
    Decode {
        path: PathBuf,
        channels: usize,
        resolution: usize,
        expected: u64,
        actual: u64,
    },
    #[error("row index {index} out of range [0, {resolution})")]
    Index { index: i64, resolution: usize },
    #[error("channel {channel} out of range [0, {channels})")]
    Channel { channel: usize, channels: usize },
    #[error("file not found: {0:?}")]
    MissingFile(PathBuf),
    #[error("failed to parse {path:?} line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("{paths} paths but {labels} labels and {colors} colors")]
    Alignment {
        paths: usize,
        labels: usize,
        colors: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse configuration")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to render {path:?}: {reason}")]
    Render { path: PathBuf, reason: String },
    #[error("failed to read variable")]
    Read(#[from] std::io::Error),
    #[error("failed to write csv data")]
    CSV(#[from] csv::Error),
    #[error("failed to encode image")]
    Image(#[from] image::ImageError),
    #[error("failed to write pickle")]
    Pickle(#[from] serde_pickle::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Initializes the `tracing` subscriber of the binaries
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
