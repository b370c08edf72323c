//! Static PNG rendering of profiles, masked slices and diagnostic series
//!
//! Plots are drawn with [plotters] into an in-memory RGB buffer and only encoded to disk
//! once the drawing succeeded, a failed plot leaves no file behind.

use crate::{ContourLevels, Error, Profile, Result, TimeSeries};
use nalgebra::DMatrix;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Line colors used when a series or a profile has no explicit color
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

/// Color scales for the filled slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Sequential white to dark blue
    Blues,
    /// Diverging blue, white, red
    RdBu,
}

impl Colormap {
    fn anchors(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Blues => &[
                (247, 251, 255),
                (198, 219, 239),
                (107, 174, 214),
                (33, 113, 181),
                (8, 48, 107),
            ],
            Colormap::RdBu => &[
                (5, 48, 97),
                (67, 147, 195),
                (247, 247, 247),
                (214, 96, 77),
                (103, 0, 31),
            ],
        }
    }
    /// Returns the color at position `t` of the scale, `t` is clamped to `[0, 1]`
    pub fn color(&self, t: f64) -> RGBColor {
        let anchors = self.anchors();
        let t = if t.is_finite() { t.clamp(0., 1.) } else { 0. };
        let s = t * (anchors.len() - 1) as f64;
        let k = (s.floor() as usize).min(anchors.len() - 2);
        let w = s - k as f64;
        let (a, b) = (anchors[k], anchors[k + 1]);
        let lerp = |u: u8, v: u8| (u as f64 + (v as f64 - u as f64) * w).round() as u8;
        RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

/// Parses a color name or a `#rrggbb` hex code
pub fn parse_color(name: &str) -> Option<RGBColor> {
    let name = name.trim().to_lowercase();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |k: usize| u8::from_str_radix(&hex[k..k + 2], 16).ok();
        return Some(RGBColor(channel(0)?, channel(2)?, channel(4)?));
    }
    let color = match name.as_str() {
        "black" | "k" => RGBColor(0, 0, 0),
        "blue" | "b" => RGBColor(0, 0, 255),
        "red" | "r" => RGBColor(255, 0, 0),
        "green" | "g" => RGBColor(0, 128, 0),
        "orange" => RGBColor(255, 165, 0),
        "purple" => RGBColor(128, 0, 128),
        "cyan" | "c" => RGBColor(0, 255, 255),
        "magenta" | "m" => RGBColor(255, 0, 255),
        "gray" | "grey" => RGBColor(128, 128, 128),
        "brown" => RGBColor(165, 42, 42),
        _ => return None,
    };
    Some(color)
}

/// Profiles of one channel plotted against y
pub struct ProfilePlot<'a> {
    /// y coordinates of the samples
    pub coordinates: &'a [f64],
    pub profiles: &'a [Profile],
    pub xlabel: &'a str,
    pub canopy_height: Option<f64>,
    /// Displayed value range, computed from the profiles if `None`
    pub value_range: Option<(f64, f64)>,
}

/// A masked slice in map orientation
pub struct ContourPlot<'a> {
    /// Sample coordinates, shared by both axes
    pub coordinates: &'a [f64],
    pub map: &'a DMatrix<f64>,
    pub levels: ContourLevels,
    pub colormap: Colormap,
    /// Roof height above each x coordinate
    pub roof: &'a [f64],
    pub label: &'a str,
    pub canopy_height: Option<f64>,
}

/// Diagnostic series overlay
pub struct SeriesPlot<'a> {
    pub series: &'a [Option<TimeSeries>],
    pub title: &'a str,
    pub xlabel: &'a str,
    pub ylabel: &'a str,
    /// Distance, in samples, between two markers, no marker if 0
    pub mark_every: usize,
}

/// Rendering backend
pub trait Render {
    /// Writes the profile plot to `path`
    fn profiles(&self, path: &Path, plot: &ProfilePlot) -> Result<()>;
    /// Writes the filled slice to `path`
    fn contour(&self, path: &Path, plot: &ContourPlot) -> Result<()>;
    /// Writes the series overlay to `path`
    fn series(&self, path: &Path, plot: &SeriesPlot) -> Result<()>;
}

/// PNG renderer based on [plotters]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlottersRenderer {
    pub profile_size: (u32, u32),
    pub contour_size: (u32, u32),
    pub series_size: (u32, u32),
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            profile_size: (600, 800),
            contour_size: (1000, 800),
            series_size: (1000, 600),
        }
    }
}

impl Render for PlottersRenderer {
    fn profiles(&self, path: &Path, plot: &ProfilePlot) -> Result<()> {
        render_png(path, self.profile_size, |root| draw_profiles(root, plot))
    }
    fn contour(&self, path: &Path, plot: &ContourPlot) -> Result<()> {
        render_png(path, self.contour_size, |root| draw_contour(root, plot))
    }
    fn series(&self, path: &Path, plot: &SeriesPlot) -> Result<()> {
        render_png(path, self.series_size, |root| draw_series(root, plot))
    }
}

fn render_png<F>(path: &Path, (width, height): (u32, u32), draw: F) -> Result<()>
where
    F: FnOnce(DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let render_error = |reason: String| Error::Render {
        path: path.to_path_buf(),
        reason,
    };
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw(root).map_err(|e| render_error(e.to_string()))?;
    }
    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| render_error("image buffer size mismatch".to_string()))?;
    image.save(path)?;
    Ok(())
}

/// Returns the (min, max) of the finite values
fn finite_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            None => Some((v, v)),
        })
}

/// Widens the range by `ratio` of its span on both ends, a point is widened to a unit interval
fn padded((lo, hi): (f64, f64), ratio: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * ratio;
        (lo - pad, hi + pad)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Splits the segment [from, to] into dashes
fn dashes(from: (f64, f64), to: (f64, f64), n_dash: usize) -> Vec<Vec<(f64, f64)>> {
    let n = 2 * n_dash.max(1) - 1;
    (0..n)
        .step_by(2)
        .map(|k| {
            let a = k as f64 / n as f64;
            let b = (k + 1) as f64 / n as f64;
            vec![
                (from.0 + (to.0 - from.0) * a, from.1 + (to.1 - from.1) * a),
                (from.0 + (to.0 - from.0) * b, from.1 + (to.1 - from.1) * b),
            ]
        })
        .collect()
}

fn draw_profiles<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, plot: &ProfilePlot) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (y_min, y_max) = finite_range(plot.coordinates.iter().copied()).unwrap_or((0., 1.));
    let (v_min, v_max) = match plot.value_range {
        Some(range) => range,
        None => padded(
            finite_range(plot.profiles.iter().flat_map(|p| p.values.iter().copied()))
                .unwrap_or((0., 1.)),
            0.05,
        ),
    };

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(v_min..v_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .light_line_style(&WHITE)
        .bold_line_style(&BLACK.mix(0.15))
        .x_desc(plot.xlabel)
        .y_desc("y")
        .axis_desc_style(("serif", 20))
        .draw()?;

    for (k, profile) in plot.profiles.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(
                profile
                    .values
                    .iter()
                    .zip(plot.coordinates)
                    .filter(|(v, _)| v.is_finite())
                    .map(|(&v, &y)| (v, y)),
                color.stroke_width(2),
            ))?
            .label(profile.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }
    if let Some(height) = plot.canopy_height {
        chart.draw_series(
            dashes((v_min, height), (v_max, height), 20)
                .into_iter()
                .map(|dash| PathElement::new(dash, &BLACK)),
        )?;
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_contour<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, plot: &ContourPlot) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (width, _) = root.dim_in_pixel();
    let (main, bar) = root.split_horizontally((width as i32 - 140).max(1));
    let (lo, hi) = finite_range(plot.coordinates.iter().copied()).unwrap_or((0., 1.));

    let mut chart = ChartBuilder::on(&main)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x")
        .y_desc("y")
        .axis_desc_style(("serif", 20))
        .draw()?;

    draw_cells(&mut chart, plot)?;
    chart.draw_series(LineSeries::new(
        plot.coordinates
            .iter()
            .zip(plot.roof)
            .map(|(&x, &y)| (x, y)),
        BLACK.stroke_width(2),
    ))?;
    if let Some(height) = plot.canopy_height {
        chart.draw_series(
            dashes((lo, height), (hi, height), 25)
                .into_iter()
                .map(|dash| PathElement::new(dash, &BLACK)),
        )?;
    }

    let (v_min, v_max) = plot.levels.range();
    let v_max = if v_max > v_min { v_max } else { v_min + 1. };
    let mut colorbar = ChartBuilder::on(&bar)
        .margin(20)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..1f64, v_min..v_max)?;
    colorbar
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc(plot.label)
        .axis_desc_style(("serif", 20))
        .draw()?;
    colorbar.draw_series((0..plot.levels.levels()).map(|band| {
        let (a, b) = plot.levels.bounds(band);
        let color = plot.colormap.color(plot.levels.normalized(band));
        Rectangle::new([(0., a), (1., b.min(v_max))], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Fills one rectangle per sample with a valid band, masked samples are left blank
fn draw_cells<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    plot: &ContourPlot,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let (lo, hi) = finite_range(plot.coordinates.iter().copied()).unwrap_or((0., 1.));
    let n = plot.coordinates.len();
    let half = if n > 1 { (hi - lo) / (n - 1) as f64 / 2. } else { 0.5 };
    let (rows, columns) = plot.map.shape();
    chart.draw_series((0..rows).flat_map(|i| {
        (0..columns).filter_map(move |j| {
            let band = plot.levels.band(plot.map[(i, j)])?;
            let (x, y) = (plot.coordinates[j], plot.coordinates[i]);
            let color = plot.colormap.color(plot.levels.normalized(band));
            Some(Rectangle::new(
                [
                    ((x - half).max(lo), (y - half).max(lo)),
                    ((x + half).min(hi), (y + half).min(hi)),
                ],
                color.filled(),
            ))
        })
    }))?;
    Ok(())
}

fn draw_series<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, plot: &SeriesPlot) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let present = || plot.series.iter().flatten();
    let (t_min, t_max) = padded(
        finite_range(present().flat_map(|s| s.time.iter().copied())).unwrap_or((0., 1.)),
        0.02,
    );
    let (v_min, v_max) = padded(
        finite_range(present().flat_map(|s| s.value.iter().copied())).unwrap_or((0., 1.)),
        0.05,
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(plot.title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(t_min..t_max, v_min..v_max)?;
    chart
        .configure_mesh()
        .light_line_style(&WHITE)
        .bold_line_style(&BLACK.mix(0.1))
        .x_desc(plot.xlabel)
        .y_desc(plot.ylabel)
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    for (k, series) in plot.series.iter().enumerate() {
        let Some(series) = series else { continue };
        let color = parse_color(&series.color).unwrap_or(PALETTE[k % PALETTE.len()]);
        chart
            .draw_series(LineSeries::new(series.points(), color.stroke_width(2)))?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        if plot.mark_every > 0 {
            chart.draw_series(
                series
                    .points()
                    .step_by(plot.mark_every)
                    .map(|point| Circle::new(point, 3, color.filled())),
            )?;
        }
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
