use super::{Error, Field, Mask, Result};
use nalgebra::DMatrix;

/// Returns the profile `field[channel, row, :]`, i.e. the samples along y at x index `row`
pub fn extract_profile(field: &Field, channel: usize, row: usize) -> Result<Vec<f64>> {
    let data = field.channel(channel)?;
    if row >= field.resolution() {
        return Err(Error::Index {
            index: row as i64,
            resolution: field.resolution(),
        });
    }
    Ok(data.row(row).iter().copied().collect())
}

/// Returns a copy of `map` where the samples excluded by `mask` are set to NaN
pub fn apply_mask(map: &DMatrix<f64>, mask: &Mask) -> Result<DMatrix<f64>> {
    if map.shape() != mask.shape() {
        return Err(Error::Shape {
            expected: map.shape(),
            found: mask.shape(),
        });
    }
    let mut masked = map.clone();
    masked
        .iter_mut()
        .zip(mask.as_matrix().iter())
        .filter(|(_, &m)| !m)
        .for_each(|(v, _)| *v = f64::NAN);
    Ok(masked)
}

/// A labelled 1D profile
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub label: String,
    pub values: Vec<f64>,
}

impl Profile {
    /// Extracts a profile from the field
    pub fn extract(field: &Field, channel: usize, row: usize) -> Result<Self> {
        Ok(Self {
            label: format!("x[{row}]"),
            values: extract_profile(field, channel, row)?,
        })
    }
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }
}

/// Filled contour levels
///
/// The range is computed from the finite samples only, so masked samples neither get a band
/// nor stretch the color scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourLevels {
    min: f64,
    max: f64,
    levels: usize,
}

impl ContourLevels {
    /// Returns `None` if the map has no finite sample
    pub fn from_valid(map: &DMatrix<f64>, levels: usize) -> Option<Self> {
        let (min, max) = map
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |range: Option<(f64, f64)>, &v| match range {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })?;
        Some(Self {
            min,
            max,
            levels: levels.max(1),
        })
    }
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
    pub fn levels(&self) -> usize {
        self.levels
    }
    /// Returns the band index of `value`, `None` for non-finite values
    pub fn band(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        if self.max <= self.min {
            return Some(0);
        }
        let t = ((value - self.min) / (self.max - self.min)).clamp(0., 1.);
        Some(((t * self.levels as f64) as usize).min(self.levels - 1))
    }
    /// Returns the position of the band in the color scale, within `[0, 1]`
    pub fn normalized(&self, band: usize) -> f64 {
        if self.levels < 2 {
            0.
        } else {
            band.min(self.levels - 1) as f64 / (self.levels - 1) as f64
        }
    }
    /// Returns the lower and upper values of a band
    pub fn bounds(&self, band: usize) -> (f64, f64) {
        let step = (self.max - self.min) / self.levels as f64;
        (
            self.min + band as f64 * step,
            self.min + (band + 1) as f64 * step,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Domain, Roof};

    fn field() -> Field {
        let values: Vec<f64> = (0..3 * 5 * 5).map(|i| i as f64).collect();
        Field::from_values(&values, 3, 5).unwrap()
    }

    #[test]
    fn profile_is_a_row() {
        let field = field();
        assert_eq!(
            extract_profile(&field, 0, 2).unwrap(),
            vec![10., 11., 12., 13., 14.]
        );
        assert_eq!(
            extract_profile(&field, 1, 4).unwrap(),
            vec![45., 46., 47., 48., 49.]
        );
    }

    #[test]
    fn profile_out_of_range() {
        let field = field();
        assert!(matches!(
            extract_profile(&field, 0, 5),
            Err(Error::Index {
                index: 5,
                resolution: 5
            })
        ));
        assert!(matches!(
            extract_profile(&field, 3, 0),
            Err(Error::Channel { .. })
        ));
    }

    #[test]
    fn profile_row_from_fraction() {
        let resolution = 129;
        let values: Vec<f64> = (0..3 * resolution * resolution)
            .map(|i| (i as f64).sin())
            .collect();
        let field = Field::from_values(&values, 3, resolution).unwrap();
        let domain = Domain::new(100., resolution).unwrap();
        for (fraction, row) in [(0.52, 67), (0.35, 45)] {
            let index = domain.row_index(fraction).unwrap();
            assert_eq!(index, row);
            for channel in 0..3 {
                let by_fraction = extract_profile(&field, channel, index).unwrap();
                let by_row = extract_profile(&field, channel, row).unwrap();
                assert_eq!(by_fraction, by_row);
                let offset = channel * resolution * resolution + row * resolution;
                assert_eq!(by_row, &values[offset..offset + resolution]);
            }
        }
    }

    #[test]
    fn mask_copies() {
        let field = field();
        let map = field.map(0).unwrap();
        let before = map.clone();
        let lower = Mask::from_matrix(DMatrix::from_fn(5, 5, |i, _| i < 2));
        let upper = Mask::from_matrix(DMatrix::from_fn(5, 5, |i, _| i >= 3));
        let a = apply_mask(&map, &lower).unwrap();
        let b = apply_mask(&map, &upper).unwrap();
        assert_eq!(map, before);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(a[(i, j)].is_nan(), i >= 2);
                assert_eq!(b[(i, j)].is_nan(), i < 3);
                if i < 2 {
                    assert_eq!(a[(i, j)], map[(i, j)]);
                }
                if i >= 3 {
                    assert_eq!(b[(i, j)], map[(i, j)]);
                }
            }
        }
    }

    #[test]
    fn mask_shape_mismatch() {
        let map = field().map(0).unwrap();
        let mask = Mask::from_matrix(DMatrix::from_element(4, 4, true));
        assert!(matches!(apply_mask(&map, &mask), Err(Error::Shape { .. })));
    }

    #[test]
    fn end_to_end_fixture() {
        // 3x5x5 slice over [0, 100] under a 2-wave roof: x = 0, 25, 50, 75, 100 gives
        // roof heights 100, 70, 100, 70, 100
        let field = field();
        let domain = Domain::new(100., 5).unwrap();
        let roof = Roof {
            wave_count: 2.,
            base: 70.,
            amplitude: 15.,
        };
        let curve = roof.curve(&domain);
        assert_eq!(curve, vec![100., 70., 100., 70., 100.]);

        let mask = roof.mask(&domain).unwrap();
        // y = 0, 25, 50 stay everywhere, y = 75 and y = 100 only where the roof is at 100
        for i in 0..5 {
            for j in 0..5 {
                let expected = i <= 2 || j % 2 == 0;
                assert_eq!(mask.is_included(i, j), expected, "({i}, {j})");
            }
        }
        assert_eq!(mask.n_included(), 21);

        let masked = apply_mask(&field.map(0).unwrap(), &mask).unwrap();
        // map[(i, j)] = field[0, j, i] = 5 j + i
        assert_eq!(masked[(0, 0)], 0.);
        assert_eq!(masked[(4, 0)], 4.);
        assert_eq!(masked[(2, 1)], 7.);
        assert!(masked[(3, 1)].is_nan());
        assert!(masked[(4, 3)].is_nan());
        assert_eq!(masked[(4, 4)], 24.);

        let levels = ContourLevels::from_valid(&masked, 4).unwrap();
        assert_eq!(levels.range(), (0., 24.));
    }

    #[test]
    fn masked_samples_do_not_scale_colors() {
        let map = DMatrix::from_row_slice(2, 3, &[1., 2., 3., 4., 1000., -1000.]);
        let mask = Mask::from_matrix(DMatrix::from_row_slice(
            2,
            3,
            &[true, true, true, true, false, false],
        ));
        let masked = apply_mask(&map, &mask).unwrap();
        let levels = ContourLevels::from_valid(&masked, 3).unwrap();
        assert_eq!(levels.range(), (1., 4.));
        assert_eq!(levels.band(masked[(1, 1)]), None);
        assert_eq!(levels.band(masked[(1, 2)]), None);
        assert_eq!(levels.band(1.), Some(0));
        assert_eq!(levels.band(2.5), Some(1));
        assert_eq!(levels.band(4.), Some(2));
        assert_eq!(levels.normalized(2), 1.);
        assert_eq!(levels.bounds(0), (1., 2.));
    }

    #[test]
    fn degenerate_levels() {
        let all_masked = DMatrix::from_element(3, 3, f64::NAN);
        assert!(ContourLevels::from_valid(&all_masked, 20).is_none());
        let flat = DMatrix::from_element(3, 3, 2.);
        let levels = ContourLevels::from_valid(&flat, 20).unwrap();
        assert_eq!(levels.band(2.), Some(0));
    }
}
