//! File Header
//!
//! Every store file starts with a 3-byte magic number followed by a 1-byte
//! format version. Files may pad the header further to keep their records
//! aligned.
//!
//! ```text
//! ┌──────────────┬─────────────┬──────────────────┐
//! │ Magic (3)    │ Version (1) │ Padding (0..n)   │
//! └──────────────┴─────────────┴──────────────────┘
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, StoreError};

/// Format description of a file header
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeaderFormat {
    /// Magic number identifying the file type
    pub magic: [u8; 3],
    /// Version written to new files
    pub current_version: u8,
    /// Oldest version this reader still understands
    pub min_version: u8,
    /// Total header length including padding
    pub length: u64,
}

impl HeaderFormat {
    /// Write a fresh header at the start of `file`
    pub(crate) fn write(&self, file: &mut File) -> Result<()> {
        let mut header = vec![0u8; self.length as usize];
        header[0..3].copy_from_slice(&self.magic);
        header[3] = self.current_version;

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header)?;
        Ok(())
    }

    /// Read and validate the header of `file`, returning its version
    ///
    /// Newer versions are rejected; older versions down to `min_version`
    /// are accepted.
    pub(crate) fn validate(&self, file: &mut File, path: &Path) -> Result<u8> {
        let file_size = file.metadata()?.len();
        if file_size < self.length {
            return Err(StoreError::TruncatedHeader {
                path: path.to_path_buf(),
            });
        }

        let mut header = [0u8; 4];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;

        if header[0..3] != self.magic {
            return Err(StoreError::InvalidMagic {
                path: path.to_path_buf(),
            });
        }

        let version = header[3];
        if version > self.current_version || version < self.min_version {
            return Err(StoreError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: version,
                min: self.min_version,
                max: self.current_version,
            });
        }

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{self, OpenOptions};

    use tempfile::TempDir;

    const TWO_VERSIONS: HeaderFormat = HeaderFormat {
        magic: *b"tst",
        current_version: 2,
        min_version: 1,
        length: 4,
    };

    fn validate_bytes(bytes: &[u8]) -> Result<u8> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("header.tst");
        fs::write(&path, bytes).unwrap();
        let mut file = OpenOptions::new().read(true).open(&path).unwrap();
        TWO_VERSIONS.validate(&mut file, &path)
    }

    #[test]
    fn test_accepts_current_version() {
        assert_eq!(validate_bytes(b"tst\x02").unwrap(), 2);
    }

    #[test]
    fn test_accepts_older_supported_version() {
        assert_eq!(validate_bytes(b"tst\x01").unwrap(), 1);
    }

    #[test]
    fn test_rejects_version_below_minimum() {
        let result = validate_bytes(b"tst\x00");

        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { found: 0, min: 1, max: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_version_above_current() {
        let result = validate_bytes(b"tst\x03");

        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { found: 3, min: 1, max: 2, .. })
        ));
    }

    #[test]
    fn test_write_pads_to_length() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("padded.tst");
        let format = HeaderFormat {
            length: 8,
            ..TWO_VERSIONS
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        format.write(&mut file).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"tst\x02\0\0\0\0");
        assert_eq!(format.validate(&mut file, &path).unwrap(), 2);
    }
}
