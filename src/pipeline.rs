//! Slice and series post-processing runs
//!
//! Each slice job, the series comparison and the reference profile are independent units: a
//! failing unit is logged and reported but does not prevent the others from being processed.

use crate::config::{Config, ReferenceJob, SeriesJob, SliceJob};
use crate::render::{ContourPlot, ProfilePlot, Render, SeriesPlot};
use crate::{
    apply_mask, build_mask, export, load_series, ContourLevels, Domain, Field, Profile, Result,
    TimeSeries,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of a post-processing run
#[derive(Debug)]
pub struct RunReport {
    /// Files written by each slice job
    pub slices: Vec<(String, Result<Vec<PathBuf>>)>,
    /// Series comparison plot
    pub series: Option<Result<PathBuf>>,
    /// Analytic reference profile plot
    pub reference: Option<Result<PathBuf>>,
}

impl RunReport {
    /// Returns the number of units that failed
    pub fn n_failed(&self) -> usize {
        self.slices.iter().filter(|(_, r)| r.is_err()).count()
            + self.series.iter().filter(|r| r.is_err()).count()
            + self.reference.iter().filter(|r| r.is_err()).count()
    }
    /// Returns the number of units of the run
    pub fn n_unit(&self) -> usize {
        self.slices.len() + self.series.iter().count() + self.reference.iter().count()
    }
    pub fn is_success(&self) -> bool {
        self.n_failed() == 0
    }
}

/// Runs all the slice jobs and the series comparison of the configuration
pub fn run<R: Render>(config: &Config, renderer: &R) -> Result<RunReport> {
    config.validate()?;
    let domain = config.domain()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let slices = config
        .slices
        .iter()
        .map(|job| {
            let outcome = process_slice(config, &domain, job, renderer);
            match &outcome {
                Ok(files) => info!(slice = %job.name, n_file = files.len(), "slice done"),
                Err(e) => error!(slice = %job.name, "{e}"),
            }
            (job.name.clone(), outcome)
        })
        .collect();
    let series = config.series.as_ref().map(|job| {
        let outcome = process_series(config, job, renderer);
        if let Err(e) = &outcome {
            error!("series comparison: {e}");
        }
        outcome
    });
    let reference = config.reference.as_ref().map(|job| {
        let outcome = process_reference(config, job, renderer);
        if let Err(e) = &outcome {
            error!("reference profile: {e}");
        }
        outcome
    });

    Ok(RunReport {
        slices,
        series,
        reference,
    })
}

/// Loads a slice dump and renders the profiles and the masked map of every configured channel
pub fn process_slice<R: Render>(
    config: &Config,
    domain: &Domain,
    job: &SliceJob,
    renderer: &R,
) -> Result<Vec<PathBuf>> {
    let field = Field::load(&job.input, config.grid.channels, domain.resolution())?;
    let row = domain.row_index(job.fraction)?;
    let coordinates = domain.coordinates();
    info!(slice = %job.name, row, x = coordinates[row], "sampling profiles");

    let roof = config.roof.curve(domain);
    let (x, y) = domain.meshgrid();
    let mask = build_mask(&x, &y, &roof)?;

    let mut files = Vec::new();
    let mut columns = Vec::new();
    for style in &config.channels {
        let mut rows = vec![row];
        rows.extend(job.reference_row);
        let profiles = rows
            .into_iter()
            .map(|r| {
                Profile::extract(&field, style.index, r)
                    .map(|p| p.with_label(format!("x = {:.1}", coordinates[r])))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = config
            .output_dir
            .join(format!("{}_profile_{}.png", job.name, style.name));
        renderer.profiles(
            &path,
            &ProfilePlot {
                coordinates: &coordinates,
                profiles: &profiles,
                xlabel: &style.label,
                canopy_height: config.canopy_height,
                value_range: style.range,
            },
        )?;
        files.push(path);
        columns.extend(
            profiles
                .into_iter()
                .map(|p| (format!("{} ({})", style.name, p.label), p.values)),
        );

        let masked = apply_mask(&field.map(style.index)?, &mask)?;
        let Some(levels) = ContourLevels::from_valid(&masked, config.levels) else {
            warn!(slice = %job.name, channel = %style.name, "no valid sample below the roof");
            continue;
        };
        let path = config
            .output_dir
            .join(format!("{}_2d_{}.png", job.name, style.name));
        renderer.contour(
            &path,
            &ContourPlot {
                coordinates: &coordinates,
                map: &masked,
                levels,
                colormap: style.colormap,
                roof: &roof,
                label: &style.label,
                canopy_height: config.canopy_height,
            },
        )?;
        files.push(path);
    }

    if config.export_csv {
        let path = config
            .output_dir
            .join(format!("{}_profiles.csv", job.name));
        export::write_profiles_csv(&path, &coordinates, &columns)?;
        files.push(path);
    }
    Ok(files)
}

/// Loads the diagnostic series and renders their comparison
pub fn process_series<R: Render>(config: &Config, job: &SeriesJob, renderer: &R) -> Result<PathBuf> {
    let paths: Vec<_> = job.entries.iter().map(|e| &e.path).collect();
    let labels: Vec<_> = job.entries.iter().map(|e| e.label.as_str()).collect();
    let colors: Vec<_> = job.entries.iter().map(|e| e.color.as_str()).collect();
    let series = load_series(&paths, &labels, &colors)?;
    info!(
        n_present = series.iter().flatten().count(),
        n_series = series.len(),
        "loaded series"
    );

    let path = config.output_dir.join(&job.output);
    renderer.series(
        &path,
        &SeriesPlot {
            series: &series,
            title: &job.title,
            xlabel: &job.xlabel,
            ylabel: &job.ylabel,
            mark_every: job.mark_every,
        },
    )?;
    Ok(path)
}

/// Samples the analytic reference profile and renders it
pub fn process_reference<R: Render>(
    config: &Config,
    job: &ReferenceJob,
    renderer: &R,
) -> Result<PathBuf> {
    let (time, value) = job
        .bump
        .along_x(job.x_range, job.y, job.n_sample)
        .into_iter()
        .unzip();
    let profile = TimeSeries {
        time,
        value,
        label: job.label.clone(),
        color: job.color.clone(),
    };
    let path = config.output_dir.join(&job.output);
    renderer.series(
        &path,
        &SeriesPlot {
            series: &[Some(profile)],
            title: &job.title,
            xlabel: &job.xlabel,
            ylabel: &job.ylabel,
            mark_every: 0,
        },
    )?;
    Ok(path)
}

/// Writes one pickle per channel of each slice dump, NaN above the roof
///
/// The pickles are written next to their dump as `<file name>_<channel>.pkl`. A dump that fails
/// to load or to export is logged and reported without stopping the others.
pub fn export_pickles<P: AsRef<Path>>(
    config: &Config,
    paths: &[P],
) -> Result<Vec<(PathBuf, Result<Vec<PathBuf>>)>> {
    config.validate()?;
    let domain = config.domain()?;
    let mask = config.roof.mask(&domain)?;
    let export_one = |path: &Path| -> Result<Vec<PathBuf>> {
        let field = Field::load(path, config.grid.channels, domain.resolution())?;
        let stem = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "slice".to_string());
        (0..field.channels())
            .map(|c| -> Result<PathBuf> {
                let masked = apply_mask(&field.map(c)?, &mask)?;
                let pkl = path.with_file_name(format!("{stem}_{c}.pkl"));
                export::write_map_pickle(&pkl, &masked)?;
                info!("{:?} -> {:?}", path, pkl);
                Ok(pkl)
            })
            .collect()
    };
    Ok(paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let outcome = export_one(path);
            if let Err(e) = &outcome {
                error!(?path, "{e}");
            }
            (path.to_path_buf(), outcome)
        })
        .collect())
}
