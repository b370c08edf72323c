use super::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Returns `true` if the path carries a `.gz` extension
pub fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Opens a data file, gunzipping it on the fly if it ends with `.gz`
///
/// A missing file is reported as [Error::MissingFile] instead of a bare I/O error.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
        _ => Error::Read(e),
    })?;
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");
        assert!(matches!(open(&path), Err(Error::MissingFile(p)) if p == path));
    }

    #[test]
    fn gunzips_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag1.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"300 2.88592\n").unwrap();
        encoder.finish().unwrap();

        let mut text = String::new();
        open(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "300 2.88592\n");
    }
}
