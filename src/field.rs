use super::{source, Error, Result};
use nalgebra::DMatrix;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const F64_BYTES: u64 = std::mem::size_of::<f64>() as u64;

/// A multi-channel square slice of the simulation
///
/// Each channel is a `resolution x resolution` matrix where the row index runs along x
/// and the column index along y, i.e. `channel(c)[(i, j)]` is the sample at `(x_i, y_j)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    resolution: usize,
    data: Vec<DMatrix<f64>>,
}

/// Returns the number of samples of a `channels x resolution x resolution` slice
pub(crate) fn n_values(channels: usize, resolution: usize) -> Result<usize> {
    channels
        .checked_mul(resolution)
        .and_then(|n| n.checked_mul(resolution))
        .filter(|n| (*n as u64).checked_mul(F64_BYTES).is_some())
        .ok_or_else(|| {
            Error::Config(format!(
                "a {channels}x{resolution}x{resolution} slice does not fit in memory"
            ))
        })
}

fn expected_bytes(channels: usize, resolution: usize) -> Result<u64> {
    Ok(n_values(channels, resolution)? as u64 * F64_BYTES)
}

impl Field {
    /// Loads a raw slice dump of `channels x resolution x resolution` native-endian `f64`
    ///
    /// Files ending with `.gz` are decompressed first.
    pub fn load<P: AsRef<Path>>(path: P, channels: usize, resolution: usize) -> Result<Self> {
        let path = path.as_ref();
        check_dims(channels, resolution)?;
        let expected = expected_bytes(channels, resolution)?;
        if !source::is_gzip(path) {
            if let Ok(meta) = std::fs::metadata(path) {
                if meta.len() != expected {
                    return Err(Error::Decode {
                        path: path.to_path_buf(),
                        channels,
                        resolution,
                        expected,
                        actual: meta.len(),
                    });
                }
            }
        }
        // one extra byte is enough to tell an oversized stream apart
        let mut bytes = Vec::new();
        source::open(path)?
            .take(expected + 1)
            .read_to_end(&mut bytes)?;
        let field = Self::decode(&bytes, channels, resolution, path)?;
        debug!(?path, channels, resolution, "loaded slice");
        Ok(field)
    }
    /// Decodes an in-memory dump
    pub fn from_bytes(bytes: &[u8], channels: usize, resolution: usize) -> Result<Self> {
        Self::decode(bytes, channels, resolution, Path::new("<memory>"))
    }
    /// Builds a field from values in (channel, x, y) row-major order
    pub fn from_values(values: &[f64], channels: usize, resolution: usize) -> Result<Self> {
        check_dims(channels, resolution)?;
        if values.len() != n_values(channels, resolution)? {
            return Err(Error::Decode {
                path: Path::new("<memory>").to_path_buf(),
                channels,
                resolution,
                expected: expected_bytes(channels, resolution)?,
                actual: values.len() as u64 * F64_BYTES,
            });
        }
        let data = values
            .chunks_exact(resolution * resolution)
            .map(|chunk| DMatrix::from_row_slice(resolution, resolution, chunk))
            .collect();
        Ok(Self { resolution, data })
    }
    fn decode(bytes: &[u8], channels: usize, resolution: usize, path: &Path) -> Result<Self> {
        check_dims(channels, resolution)?;
        let expected = expected_bytes(channels, resolution)?;
        if bytes.len() as u64 != expected {
            return Err(Error::Decode {
                path: path.to_path_buf(),
                channels,
                resolution,
                expected,
                actual: bytes.len() as u64,
            });
        }
        let values: Vec<f64> = bytes
            .chunks_exact(F64_BYTES as usize)
            .map(|chunk| {
                let mut word = [0u8; F64_BYTES as usize];
                word.copy_from_slice(chunk);
                f64::from_ne_bytes(word)
            })
            .collect();
        Self::from_values(&values, channels, resolution)
    }
    /// Returns the number of channels
    pub fn channels(&self) -> usize {
        self.data.len()
    }
    /// Returns the number of samples along each axis
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    /// Returns channel `c` as a (x, y) matrix
    pub fn channel(&self, c: usize) -> Result<&DMatrix<f64>> {
        self.data.get(c).ok_or(Error::Channel {
            channel: c,
            channels: self.channels(),
        })
    }
    /// Returns channel `c` transposed into map orientation: rows along y, columns along x
    pub fn map(&self, c: usize) -> Result<DMatrix<f64>> {
        Ok(self.channel(c)?.transpose())
    }
    /// Returns the statistics of the finite values of channel `c`, `None` if there is none
    pub fn stats(&self, c: usize) -> Result<Option<ChannelStats>> {
        let data = self.channel(c)?;
        let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Ok(None);
        }
        Ok(Some(ChannelStats {
            min: finite.iter().copied().fold(f64::INFINITY, f64::min),
            max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: finite.iter().sum::<f64>() / finite.len() as f64,
            n_non_finite: data.len() - finite.len(),
        }))
    }
    /// Iterates over all the values in source order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.resolution;
        self.data
            .iter()
            .flat_map(move |m| (0..n).flat_map(move |i| (0..n).map(move |j| m[(i, j)])))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub n_non_finite: usize,
}

fn check_dims(channels: usize, resolution: usize) -> Result<()> {
    if channels == 0 || resolution == 0 {
        return Err(Error::Config(format!(
            "a slice needs at least one channel and one sample, got {channels}x{resolution}x{resolution}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.5 - 3.0).collect()
    }

    fn to_bytes(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn round_trip_identity() {
        for (channels, resolution) in [(1, 1), (3, 5), (2, 7), (3, 129)] {
            let values = ramp(channels * resolution * resolution);
            let field = Field::from_bytes(&to_bytes(&values), channels, resolution).unwrap();
            assert_eq!(field.channels(), channels);
            assert_eq!(field.resolution(), resolution);
            assert_eq!(field.values().collect::<Vec<_>>(), values);
        }
    }

    #[test]
    fn rows_run_along_x() {
        let values = ramp(3 * 5 * 5);
        let field = Field::from_values(&values, 3, 5).unwrap();
        // field[1, 2, 4] == values[1 * 25 + 2 * 5 + 4]
        assert_eq!(field.channel(1).unwrap()[(2, 4)], values[39]);
        assert_eq!(field.map(1).unwrap()[(4, 2)], values[39]);
    }

    #[test]
    fn size_mismatch() {
        let (channels, resolution) = (3, 5);
        let n = channels * resolution * resolution;
        for len in [n - 1, n + 1, n / 2, 2 * n] {
            let bytes = to_bytes(&ramp(len));
            match Field::from_bytes(&bytes, channels, resolution) {
                Err(Error::Decode {
                    expected, actual, ..
                }) => {
                    assert_eq!(expected, n as u64 * 8);
                    assert_eq!(actual, len as u64 * 8);
                }
                other => panic!("expected a decode error for {len} values, got {other:?}"),
            }
        }
    }

    #[test]
    fn partial_word() {
        let mut bytes = to_bytes(&ramp(75));
        bytes.pop();
        assert!(matches!(
            Field::from_bytes(&bytes, 3, 5),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn missing_channel() {
        let field = Field::from_values(&ramp(75), 3, 5).unwrap();
        assert!(matches!(
            field.channel(3),
            Err(Error::Channel {
                channel: 3,
                channels: 3
            })
        ));
    }

    #[test]
    fn channel_stats() {
        let mut values = ramp(2 * 2 * 2);
        values[5] = f64::NAN;
        values[6] = f64::NAN;
        values[7] = f64::INFINITY;
        let field = Field::from_values(&values, 2, 2).unwrap();
        assert_eq!(
            field.stats(0).unwrap(),
            Some(ChannelStats {
                min: values[0],
                max: values[3],
                mean: values[..4].iter().sum::<f64>() / 4.,
                n_non_finite: 0,
            })
        );
        let stats = field.stats(1).unwrap().unwrap();
        assert_eq!((stats.min, stats.max, stats.n_non_finite), (values[4], values[4], 3));
        assert!(matches!(field.stats(2), Err(Error::Channel { .. })));
        let blank = Field::from_values(&[f64::NAN; 4], 1, 2).unwrap();
        assert_eq!(blank.stats(0).unwrap(), None);
    }

    #[test]
    fn load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice_50");
        let values = ramp(3 * 9 * 9);
        std::fs::write(&path, to_bytes(&values)).unwrap();
        let field = Field::load(&path, 3, 9).unwrap();
        assert_eq!(field.values().collect::<Vec<_>>(), values);
        assert!(matches!(
            Field::load(&path, 3, 8),
            Err(Error::Decode { path: p, .. }) if p == path
        ));
    }

    #[test]
    fn load_gzipped_file() {
        use flate2::{write::GzEncoder, Compression};
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice_50.gz");
        let values = ramp(3 * 4 * 4);
        let mut encoder =
            GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
        encoder.write_all(&to_bytes(&values)).unwrap();
        encoder.finish().unwrap();
        let field = Field::load(&path, 3, 4).unwrap();
        assert_eq!(field.values().collect::<Vec<_>>(), values);
        assert!(matches!(
            Field::load(&path, 3, 5),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn oversized_gzip_stops_early() {
        use flate2::{write::GzEncoder, Compression};
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice_50.gz");
        let mut encoder =
            GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
        encoder.write_all(&to_bytes(&ramp(3 * 64 * 64))).unwrap();
        encoder.finish().unwrap();
        match Field::load(&path, 3, 4) {
            Err(Error::Decode {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 3 * 16 * 8);
                assert_eq!(actual, expected + 1);
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_dimensions() {
        assert!(matches!(
            Field::from_bytes(&[], 3, usize::MAX),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Field::from_values(&[], 1, usize::MAX / 3),
            Err(Error::Config(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Field::load(dir.path().join("slice_50"), 3, usize::MAX / 2),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Field::load(dir.path().join("slice_99"), 3, 5),
            Err(Error::MissingFile(_))
        ));
    }
}
