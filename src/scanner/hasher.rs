//! Chunk hashing for cheap content pre-matching.
//!
//! Rather than hashing whole files, the pipeline hashes only the first or
//! last N bytes (4 KiB by default); two files whose chunks collide still go
//! through a full comparison when content matching is on, so a fast
//! non-cryptographic 64-bit hash (XXH3) is exactly enough.

use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::compare::read_fill;

/// Errors raised while hashing a file chunk.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between discovery and hashing.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other I/O failure, including reads cut short by concurrent
    /// truncation.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Hash up to `byte_count` bytes from the start or end of the file.
///
/// `file_size` is the size observed at discovery; chunks are clamped to it,
/// so files smaller than `byte_count` hash their whole content. A read that
/// produces fewer bytes than the clamp promises is an error.
pub fn hash_file_chunk(
    path: &Path,
    file_size: u64,
    byte_count: u64,
    from_start: bool,
) -> Result<u64, HashError> {
    let count = byte_count.min(file_size);

    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    if !from_start {
        file.seek(SeekFrom::End(-(count as i64)))
            .map_err(|e| HashError::from_io(path, e))?;
    }

    let mut buffer = vec![0u8; count as usize];
    let filled = read_fill(&mut file, &mut buffer).map_err(|e| HashError::from_io(path, e))?;
    if (filled as u64) < count {
        return Err(HashError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {count} bytes, got {filled}"),
            ),
        });
    }

    Ok(xxh3_64(&buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_hash_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"some stable content");
        let size = 19;

        let first = hash_file_chunk(&path, size, 4096, true).unwrap();
        let second = hash_file_chunk(&path, size, 4096, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_first_and_last_chunks_differ_for_asymmetric_files() {
        let dir = TempDir::new().unwrap();
        let mut content = vec![0u8; 8192];
        content[8191] = 1;
        let path = write_file(&dir, "f", &content);

        let head = hash_file_chunk(&path, 8192, 4096, true).unwrap();
        let tail = hash_file_chunk(&path, 8192, 4096, false).unwrap();
        assert_ne!(head, tail);
    }

    #[test]
    fn test_chunk_clamped_to_file_size() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"tiny");

        // Requesting more than the file holds hashes the whole file, from
        // either end.
        let head = hash_file_chunk(&path, 4, 4096, true).unwrap();
        let tail = hash_file_chunk(&path, 4, 4096, false).unwrap();
        assert_eq!(head, tail);
        assert_eq!(head, xxh3_64(b"tiny"));
    }

    #[test]
    fn test_equal_prefixes_collide() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"shared-prefix-AAAA");
        let b = write_file(&dir, "b", b"shared-prefix-BBBB");

        let ha = hash_file_chunk(&a, 18, 13, true).unwrap();
        let hb = hash_file_chunk(&b, 18, 13, true).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            hash_file_chunk(&missing, 100, 4096, true),
            Err(HashError::NotFound(_))
        ));
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "f", b"xy");
        // Discovery saw 100 bytes, the file now has 2.
        assert!(matches!(
            hash_file_chunk(&path, 100, 4096, true),
            Err(HashError::Io { .. })
        ));
    }
}
