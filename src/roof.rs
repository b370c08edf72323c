use super::{Domain, Error, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::PI;

/// Wavy greenhouse roof
///
/// The roof height above `x` is `base + amplitude + amplitude cos(2 pi wave_count x / extent)`,
/// so it oscillates between `base` and `base + 2 amplitude`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Roof {
    pub wave_count: f64,
    pub base: f64,
    pub amplitude: f64,
}

impl Default for Roof {
    fn default() -> Self {
        Self {
            wave_count: 2.,
            base: 70.,
            amplitude: 15.,
        }
    }
}

impl Roof {
    /// Returns the roof height at `x` for a domain of width `extent`
    pub fn height(&self, x: f64, extent: f64) -> f64 {
        self.base + self.amplitude + self.amplitude * (2. * PI * self.wave_count * x / extent).cos()
    }
    /// Returns the roof height at every x coordinate of the domain
    pub fn curve(&self, domain: &Domain) -> Vec<f64> {
        domain
            .coordinates()
            .into_iter()
            .map(|x| self.height(x, domain.extent()))
            .collect()
    }
    /// Returns the mask of the domain below the roof
    pub fn mask(&self, domain: &Domain) -> Result<Mask> {
        let (x, y) = domain.meshgrid();
        build_mask(&x, &y, &self.curve(domain))
    }
}

/// Inclusion mask in map orientation (rows along y, columns along x)
///
/// `true` marks a sample inside the physical domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(DMatrix<bool>);

impl Mask {
    pub fn from_matrix(inner: DMatrix<bool>) -> Self {
        Self(inner)
    }
    pub fn shape(&self) -> (usize, usize) {
        self.0.shape()
    }
    pub fn is_included(&self, row: usize, column: usize) -> bool {
        self.0[(row, column)]
    }
    /// Returns the number of included samples
    pub fn n_included(&self) -> usize {
        self.0.iter().filter(|m| **m).count()
    }
    pub fn as_matrix(&self) -> &DMatrix<bool> {
        &self.0
    }
}

/// Builds the mask of the samples lying at or below the roof curve
///
/// `roof_curve[j]` is the roof height above column `j` of the `x` and `y` meshes; a sample is
/// excluded only if `y > roof_curve`, samples on the roof are kept.
pub fn build_mask(x: &DMatrix<f64>, y: &DMatrix<f64>, roof_curve: &[f64]) -> Result<Mask> {
    if x.shape() != y.shape() {
        return Err(Error::Shape {
            expected: x.shape(),
            found: y.shape(),
        });
    }
    if roof_curve.len() != y.ncols() {
        return Err(Error::Shape {
            expected: (1, y.ncols()),
            found: (1, roof_curve.len()),
        });
    }
    Ok(Mask(DMatrix::from_fn(y.nrows(), y.ncols(), |i, j| {
        y[(i, j)].partial_cmp(&roof_curve[j]) != Some(Ordering::Greater)
    })))
}
