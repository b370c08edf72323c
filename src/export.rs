//! Numeric exports of the post-processed slices

use crate::{Error, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::path::Path;

/// Writes profiles as csv columns next to their y coordinates
pub fn write_profiles_csv<P: AsRef<Path>>(
    path: P,
    coordinates: &[f64],
    columns: &[(String, Vec<f64>)],
) -> Result<()> {
    if let Some((_, values)) = columns
        .iter()
        .find(|(_, values)| values.len() != coordinates.len())
    {
        return Err(Error::Shape {
            expected: (coordinates.len(), 1),
            found: (values.len(), 1),
        });
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(std::iter::once("y").chain(columns.iter().map(|(name, _)| name.as_str())))?;
    for (k, y) in coordinates.iter().enumerate() {
        wtr.write_record(
            std::iter::once(y.to_string()).chain(columns.iter().map(|(_, v)| v[k].to_string())),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pickles a map as a list of rows, masked samples are NaN
pub fn write_map_pickle<P: AsRef<Path>>(path: P, map: &DMatrix<f64>) -> Result<()> {
    let rows: Vec<Vec<f64>> = map
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    serde_pickle::to_writer(&mut File::create(path)?, &rows, Default::default())?;
    Ok(())
}
