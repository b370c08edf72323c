//! Post-processing configuration
//!
//! Every field has a default reproducing the reference greenhouse case, a YAML file only needs
//! to hold the values that differ:
//!
//! ```yaml
//! grid:
//!   resolution: 257
//! slices:
//!   - name: slice_50
//!     input: W12/slice_50
//!     fraction: 0.35
//! ```

use crate::render::{Colormap, PlottersRenderer};
use crate::{Domain, Error, GaussianBump, Result, Roof};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Slice dump layout
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Grid {
    /// Number of samples per axis
    pub resolution: usize,
    /// Physical width of the square domain
    pub extent: f64,
    /// Number of fields in a dump
    pub channels: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            resolution: 129,
            extent: 100.,
            channels: 3,
        }
    }
}

/// How one channel of the slices is plotted
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChannelStyle {
    pub index: usize,
    /// Short name used in the output file names
    pub name: String,
    /// Axis and color bar label
    pub label: String,
    #[serde(default = "default_colormap")]
    pub colormap: Colormap,
    /// Displayed value range of the profiles
    #[serde(default)]
    pub range: Option<(f64, f64)>,
}

fn default_colormap() -> Colormap {
    Colormap::Blues
}

/// A slice dump to post-process
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SliceJob {
    pub name: String,
    pub input: PathBuf,
    /// Position of the sampled profile as a fraction of the domain width
    #[serde(default = "default_fraction")]
    pub fraction: f64,
    /// Row of the reference profile plotted alongside
    #[serde(default = "default_reference_row")]
    pub reference_row: Option<usize>,
}

fn default_fraction() -> f64 {
    0.52
}
fn default_reference_row() -> Option<usize> {
    Some(1)
}

/// A diagnostic file of the series comparison
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeriesEntry {
    pub path: PathBuf,
    pub label: String,
    pub color: String,
}

/// Diagnostic series comparison
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SeriesJob {
    pub entries: Vec<SeriesEntry>,
    pub output: PathBuf,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub mark_every: usize,
}

impl Default for SeriesJob {
    fn default() -> Self {
        let entry = |dir: &str, label: &str, color: &str| SeriesEntry {
            path: Path::new(dir).join("diag1"),
            label: label.to_string(),
            color: color.to_string(),
        };
        Self {
            entries: vec![
                entry("Ex1_NW_Hleaf", "Ex1: No Wind, Horizontal Leaf", "blue"),
                entry("Ex2_W_Hleaf", "Ex2: With Wind, Horizontal Leaf", "red"),
                entry("Ex3_NW_Vleaf", "Ex3: No Wind, Vertical Leaf", "green"),
                entry("Ex4_W_Vleaf", "Ex4: With Wind, Vertical Leaf", "orange"),
            ],
            output: PathBuf::from("co2_flux_comparison.png"),
            title: "CO2 Diffusive Flux at Leaf Surface".to_string(),
            xlabel: "Time (s)".to_string(),
            ylabel: "CO2 Flux (mmol/s)".to_string(),
            mark_every: 10,
        }
    }
}

/// Analytic reference profile plotted on its own
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReferenceJob {
    pub bump: GaussianBump,
    /// Sampled segment of the horizontal line at `y`
    pub x_range: (f64, f64),
    pub y: f64,
    pub n_sample: usize,
    pub label: String,
    pub color: String,
    pub output: PathBuf,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
}

impl Default for ReferenceJob {
    fn default() -> Self {
        Self {
            bump: GaussianBump::default(),
            x_range: (-0.5, 0.5),
            y: 0.,
            n_sample: 1000,
            label: "Temperature at y=0".to_string(),
            color: "blue".to_string(),
            output: PathBuf::from("temp_profile_y0.png"),
            title: String::new(),
            xlabel: "x position".to_string(),
            ylabel: "Temperature (°C)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub grid: Grid,
    pub roof: Roof,
    /// Height of the canopy top, drawn as a dashed line
    pub canopy_height: Option<f64>,
    /// Number of filled contour levels
    pub levels: usize,
    pub channels: Vec<ChannelStyle>,
    pub slices: Vec<SliceJob>,
    pub series: Option<SeriesJob>,
    pub reference: Option<ReferenceJob>,
    pub output_dir: PathBuf,
    /// Also write the sampled profiles of each slice as csv
    pub export_csv: bool,
    pub image: PlottersRenderer,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            roof: Roof::default(),
            canopy_height: Some(30.),
            levels: 20,
            channels: vec![
                ChannelStyle {
                    index: 0,
                    name: "cw".to_string(),
                    label: "c_w".to_string(),
                    colormap: Colormap::Blues,
                    range: None,
                },
                ChannelStyle {
                    index: 1,
                    name: "ux".to_string(),
                    label: "u_x".to_string(),
                    colormap: Colormap::RdBu,
                    range: None,
                },
            ],
            slices: vec![SliceJob {
                name: "slice_50".to_string(),
                input: PathBuf::from("W12/slice_50"),
                fraction: default_fraction(),
                reference_row: default_reference_row(),
            }],
            series: Some(SeriesJob::default()),
            reference: None,
            output_dir: PathBuf::from("."),
            export_csv: false,
            image: PlottersRenderer::default(),
        }
    }
}

impl Config {
    /// Loads and validates a YAML configuration file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
            _ => Error::Read(e),
        })?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }
    /// Parses and validates a YAML configuration
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
    /// Returns the sampling domain of the slices
    pub fn domain(&self) -> Result<Domain> {
        Domain::new(self.grid.extent, self.grid.resolution)
    }
    pub fn validate(&self) -> Result<()> {
        self.domain()?;
        if self.grid.channels == 0 {
            return Err(Error::Config("slices need at least one channel".to_string()));
        }
        crate::field::n_values(self.grid.channels, self.grid.resolution)?;
        if self.levels == 0 {
            return Err(Error::Config("at least one contour level is needed".to_string()));
        }
        if let Some(style) = self
            .channels
            .iter()
            .find(|style| style.index >= self.grid.channels)
        {
            return Err(Error::Config(format!(
                "channel {} ({}) is not in a {} channel slice",
                style.index, style.name, self.grid.channels
            )));
        }
        if let Some(job) = self.slices.iter().find(|job| !job.fraction.is_finite()) {
            return Err(Error::Config(format!(
                "slice {} has a non finite fraction",
                job.name
            )));
        }
        if let Some(job) = &self.reference {
            let (x_min, x_max) = job.x_range;
            if job.n_sample < 2 || !(x_min.is_finite() && x_max.is_finite() && x_min < x_max) {
                return Err(Error::Config(format!(
                    "reference profile needs at least 2 samples over a finite range, got {} over {:?}",
                    job.n_sample, job.x_range
                )));
            }
        }
        Ok(())
    }
}
