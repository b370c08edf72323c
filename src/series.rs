use super::{source, Error, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// A (time, value) diagnostic series with its legend label and color
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
    pub label: String,
    pub color: String,
}

impl TimeSeries {
    /// Loads a whitespace delimited two-column text file
    ///
    /// Blank lines and lines starting with `#` are skipped, every other line must hold exactly
    /// two numbers.
    pub fn from_path<P, L, C>(path: P, label: L, color: C) -> Result<Self>
    where
        P: AsRef<Path>,
        L: Into<String>,
        C: Into<String>,
    {
        let path = path.as_ref();
        let reader = BufReader::new(source::open(path)?);
        let parse_error = |line: usize, reason: String| Error::Parse {
            path: path.to_path_buf(),
            line,
            reason,
        };
        let mut time = Vec::new();
        let mut value = Vec::new();
        for (k, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() != 2 {
                return Err(parse_error(
                    k + 1,
                    format!("expected 2 columns, found {}", columns.len()),
                ));
            }
            let mut numbers = [0f64; 2];
            for (number, token) in numbers.iter_mut().zip(&columns) {
                *number = token
                    .parse()
                    .map_err(|_| parse_error(k + 1, format!("invalid number {token:?}")))?;
            }
            time.push(numbers[0]);
            value.push(numbers[1]);
        }
        Ok(Self {
            time,
            value,
            label: label.into(),
            color: color.into(),
        })
    }
    pub fn len(&self) -> usize {
        self.time.len()
    }
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
    /// Iterates over the (time, value) pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.value.iter().copied())
    }
}

/// Loads a collection of diagnostic series
///
/// The collection keeps one slot per path: a missing or unreadable file leaves a `None` in its
/// place so labels and colors stay aligned with the paths.
pub fn load_series<P, S>(paths: &[P], labels: &[S], colors: &[S]) -> Result<Vec<Option<TimeSeries>>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    if paths.len() != labels.len() || paths.len() != colors.len() {
        return Err(Error::Alignment {
            paths: paths.len(),
            labels: labels.len(),
            colors: colors.len(),
        });
    }
    Ok(paths
        .iter()
        .zip(labels)
        .zip(colors)
        .map(|((path, label), color)| {
            let path: PathBuf = path.as_ref().to_path_buf();
            match TimeSeries::from_path(&path, label.as_ref(), color.as_ref()) {
                Ok(series) => {
                    info!(?path, n_sample = series.len(), "loaded series");
                    Some(series)
                }
                Err(Error::MissingFile(_)) => {
                    warn!(?path, "series not found, skipping");
                    None
                }
                Err(e) => {
                    error!(?path, "{e}");
                    None
                }
            }
        })
        .collect())
}
