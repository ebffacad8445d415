use std::fs;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::error::RcsbError;

/// Writes `bytes` to a fresh temp file inside `dir`. The file is removed when the
/// handle drops unless it is persisted.
pub fn write_temp(dir: &Utf8Path, bytes: &[u8]) -> Result<NamedTempFile, RcsbError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| RcsbError::Filesystem(format!("create {dir}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-rcsb-download")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| RcsbError::Filesystem(err.to_string()))?;
    temp.write_all(bytes)
        .map_err(|err| RcsbError::Filesystem(err.to_string()))?;
    temp.flush()
        .map_err(|err| RcsbError::Filesystem(err.to_string()))?;
    Ok(temp)
}

/// Moves a temp file to `dest`, replacing any existing file.
pub fn persist(temp: NamedTempFile, dest: &Utf8Path) -> Result<Utf8PathBuf, RcsbError> {
    if dest.as_std_path().exists() {
        fs::remove_file(dest.as_std_path())
            .map_err(|err| RcsbError::Filesystem(format!("remove {dest}: {err}")))?;
    }
    temp.persist(dest.as_std_path())
        .map_err(|err| RcsbError::Filesystem(format!("persist {dest}: {err}")))?;
    Ok(dest.to_path_buf())
}

/// Reads a downloaded text file, inflating it first when `gzipped`.
pub fn read_text(path: &Utf8Path, gzipped: bool) -> Result<String, RcsbError> {
    let file = fs::File::open(path.as_std_path())
        .map_err(|err| RcsbError::Filesystem(format!("open {path}: {err}")))?;
    let mut text = String::new();
    if gzipped {
        GzDecoder::new(file)
            .read_to_string(&mut text)
            .map_err(|err| RcsbError::Filesystem(format!("decompress {path}: {err}")))?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)
            .map_err(|err| RcsbError::Filesystem(format!("read {path}: {err}")))?;
    }
    Ok(text)
}

pub fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf, RcsbError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path| RcsbError::Filesystem(format!("non-utf8 path {}", path.display())))
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn temp_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_path(dir.path()).unwrap();
        let temp = write_temp(&root, b"HEADER").unwrap();
        let path = utf8_path(temp.path()).unwrap();
        assert_eq!(read_text(&path, false).unwrap(), "HEADER");
        drop(temp);
        assert!(!path.as_std_path().exists());
    }

    #[test]
    fn gzip_round_trip_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_path(dir.path()).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"data_4HHB\n").unwrap();
        let temp = write_temp(&root, &encoder.finish().unwrap()).unwrap();

        let dest = root.join("4HHB.cif.gz");
        let saved = persist(temp, &dest).unwrap();
        assert_eq!(read_text(&saved, true).unwrap(), "data_4HHB\n");
    }
}
