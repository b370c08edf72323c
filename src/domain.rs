use super::{Error, Result};
use nalgebra::DMatrix;

/// Square physical domain `[0, extent] x [0, extent]` sampled on `resolution` points per axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    extent: f64,
    resolution: usize,
}

impl Domain {
    pub fn new(extent: f64, resolution: usize) -> Result<Self> {
        if !(extent.is_finite() && extent > 0.) {
            return Err(Error::Config(format!(
                "domain extent must be finite and positive, got {extent}"
            )));
        }
        if resolution < 2 {
            return Err(Error::Config(format!(
                "domain resolution must be at least 2, got {resolution}"
            )));
        }
        Ok(Self { extent, resolution })
    }
    pub fn extent(&self) -> f64 {
        self.extent
    }
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    /// Returns the evenly spaced sample coordinates, from 0 to `extent` included
    pub fn coordinates(&self) -> Vec<f64> {
        let last = (self.resolution - 1) as f64;
        (0..self.resolution)
            .map(|k| self.extent * k as f64 / last)
            .collect()
    }
    /// Returns the (X, Y) coordinate meshes
    ///
    /// X varies along columns and Y along rows: `X[(i, j)] = x_j` and `Y[(i, j)] = y_i`.
    pub fn meshgrid(&self) -> (DMatrix<f64>, DMatrix<f64>) {
        let xi = self.coordinates();
        let n = self.resolution;
        (
            DMatrix::from_fn(n, n, |_, j| xi[j]),
            DMatrix::from_fn(n, n, |i, _| xi[i]),
        )
    }
    /// Converts a fraction of the domain into the nearest sample index
    ///
    /// The index is `round(resolution * fraction)`, it must fall within `[0, resolution)`.
    pub fn row_index(&self, fraction: f64) -> Result<usize> {
        let index = (self.resolution as f64 * fraction).round();
        if !index.is_finite() || index < 0. || index >= self.resolution as f64 {
            return Err(Error::Index {
                index: if index.is_finite() { index as i64 } else { i64::MAX },
                resolution: self.resolution,
            });
        }
        Ok(index as usize)
    }
}
