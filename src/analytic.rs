use serde::{Deserialize, Serialize};

/// Radial bump `base + amplitude * exp(-sharpness * r^2)` centered on `center`
///
/// Used as the prescribed initial temperature of the basic diffusion case.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GaussianBump {
    pub base: f64,
    pub amplitude: f64,
    pub sharpness: f64,
    pub center: (f64, f64),
}

impl Default for GaussianBump {
    fn default() -> Self {
        Self {
            base: 20.,
            amplitude: 10.,
            sharpness: 60.,
            center: (0., 0.),
        }
    }
}

impl GaussianBump {
    /// Returns the bump value at `(x, y)`
    pub fn value(&self, x: f64, y: f64) -> f64 {
        let (cx, cy) = self.center;
        let r2 = (x - cx).powi(2) + (y - cy).powi(2);
        self.base + self.amplitude * (-self.sharpness * r2).exp()
    }
    /// Samples `n_sample` evenly spaced (x, value) pairs of the horizontal line at `y`
    pub fn along_x(&self, (x_min, x_max): (f64, f64), y: f64, n_sample: usize) -> Vec<(f64, f64)> {
        let step = if n_sample > 1 {
            (x_max - x_min) / (n_sample - 1) as f64
        } else {
            0.
        };
        (0..n_sample)
            .map(|k| {
                let x = x_min + step * k as f64;
                (x, self.value(x, y))
            })
            .collect()
    }
}
