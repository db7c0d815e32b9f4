//! Owned, scoped access to one product file.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::debug;

use crate::prelude::{L1bError, L1bResult};

/// The bytes of one product file, read with a single buffered read.
///
/// A `ProductFile` is handed by value to exactly one adapter; dropping it
/// releases the buffer.
#[derive(Debug, Clone)]
pub struct ProductFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl ProductFile {
    pub fn open<P: AsRef<Path>>(path: P) -> L1bResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(L1bError::InvalidFilePath {
                reason: "not a regular file".into(),
                path,
            });
        }
        let bytes = fs::read(&path).map_err(|err| L1bError::InvalidFilePath {
            reason: err.to_string(),
            path: path.clone(),
        })?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Ok(Self { path, bytes })
    }

    /// Wraps bytes that are already in memory.
    pub fn from_bytes<P: Into<PathBuf>>(path: P, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, used as the mission data source label.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Line-oriented reader positioned at the start of the file.
    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn open_missing_file_is_invalid_path() {
        let err = ProductFile::open("/definitely/not/here.DBL").unwrap_err();
        assert!(matches!(err, L1bError::InvalidFilePath { .. }));
    }

    #[test]
    fn open_reads_all_bytes() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"MPH").unwrap();
        let product = ProductFile::open(temp.path()).unwrap();
        assert_eq!(product.bytes(), b"MPH");
        assert!(!product.file_name().is_empty());
    }
}
