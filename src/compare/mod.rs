//! Byte-level file comparison.
//!
//! Two comparison surfaces live here:
//!
//! - [`compare_files`]: streaming equality of two files, used by the
//!   all-vs-all pipeline to confirm candidate pairs;
//! - [`masked::MaskedPattern`]: comparison and search against a reference
//!   buffer in which designated byte positions are wildcards, used by the
//!   compare-to-file mode.
//!
//! Every operation distinguishes three outcomes: match, no-match, and
//! error. Errors (open failures, short reads, inconsistent masks) are never
//! folded into either verdict; callers log them and keep the file out of
//! any result group.

pub mod masked;

pub use masked::MaskedPattern;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Default chunk size for streaming reads.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Outcome of a comparison that completed without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The files (or regions) are equal under the requested relation.
    Match,
    /// They are not.
    NoMatch,
}

/// Comparison failures, kept distinct from both verdicts.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// A file could not be opened or stat'ed.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A read or seek failed mid-stream.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Fewer bytes arrived than the file's reported size promised,
    /// suggesting concurrent modification.
    #[error("short read on {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Path being read
        path: PathBuf,
        /// Bytes the read should have produced
        expected: u64,
        /// Bytes actually produced
        actual: u64,
    },

    /// The mask does not cover the reference buffer.
    #[error("mask has {words} words but the reference needs {needed}")]
    MaskTooShort {
        /// Words present in the mask
        words: usize,
        /// Words required for the reference length
        needed: usize,
    },
}

/// Compare two files byte for byte.
///
/// Size inequality short-circuits to [`Verdict::NoMatch`] without reading
/// any content. Equal-size files are streamed in `buffer_size` chunks; a
/// mid-stream length divergence (a file changed underneath us) is an error.
pub fn compare_files(a: &Path, b: &Path, buffer_size: usize) -> Result<Verdict, CompareError> {
    let open = |path: &Path| -> Result<(File, u64), CompareError> {
        let file = File::open(path).map_err(|source| CompareError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let size = file
            .metadata()
            .map_err(|source| CompareError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        Ok((file, size))
    };

    let (mut file_a, size_a) = open(a)?;
    let (mut file_b, size_b) = open(b)?;
    if size_a != size_b {
        return Ok(Verdict::NoMatch);
    }

    let buffer_size = buffer_size.max(1);
    let mut buf_a = vec![0u8; buffer_size];
    let mut buf_b = vec![0u8; buffer_size];

    loop {
        let read_a = read_fill(&mut file_a, &mut buf_a).map_err(|source| CompareError::Io {
            path: a.to_path_buf(),
            source,
        })?;
        let read_b = read_fill(&mut file_b, &mut buf_b).map_err(|source| CompareError::Io {
            path: b.to_path_buf(),
            source,
        })?;

        if read_a != read_b {
            // Same reported size but diverging streams.
            let (path, expected, actual) = if read_a < read_b {
                (a, read_b, read_a)
            } else {
                (b, read_a, read_b)
            };
            return Err(CompareError::ShortRead {
                path: path.to_path_buf(),
                expected: expected as u64,
                actual: actual as u64,
            });
        }
        if read_a == 0 {
            return Ok(Verdict::Match);
        }
        if buf_a[..read_a] != buf_b[..read_b] {
            return Ok(Verdict::NoMatch);
        }
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
pub(crate) fn read_fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
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
    fn test_equal_files_match() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"identical content");
        let b = write_file(&dir, "b", b"identical content");
        assert_eq!(
            compare_files(&a, &b, DEFAULT_BUFFER_SIZE).unwrap(),
            Verdict::Match
        );
    }

    #[test]
    fn test_different_sizes_no_match_without_reading() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"short");
        let b = write_file(&dir, "b", b"much longer content");
        assert_eq!(
            compare_files(&a, &b, DEFAULT_BUFFER_SIZE).unwrap(),
            Verdict::NoMatch
        );
    }

    #[test]
    fn test_same_size_different_content() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"aaaa");
        let b = write_file(&dir, "b", b"aaab");
        assert_eq!(
            compare_files(&a, &b, DEFAULT_BUFFER_SIZE).unwrap(),
            Verdict::NoMatch
        );
    }

    #[test]
    fn test_difference_beyond_first_buffer() {
        let dir = TempDir::new().unwrap();
        let mut content_a = vec![0xABu8; 10_000];
        let content_b = content_a.clone();
        content_a[9_999] = 0xCD;
        let a = write_file(&dir, "a", &content_a);
        let b = write_file(&dir, "b", &content_b);
        // Buffer smaller than the file forces multiple rounds.
        assert_eq!(compare_files(&a, &b, 1024).unwrap(), Verdict::NoMatch);
    }

    #[test]
    fn test_empty_files_match() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"");
        let b = write_file(&dir, "b", b"");
        assert_eq!(
            compare_files(&a, &b, DEFAULT_BUFFER_SIZE).unwrap(),
            Verdict::Match
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a", b"data");
        let missing = dir.path().join("missing");
        assert!(matches!(
            compare_files(&a, &missing, DEFAULT_BUFFER_SIZE),
            Err(CompareError::Open { .. })
        ));
    }

    #[test]
    fn test_read_fill_loops_to_capacity() {
        let data = vec![7u8; 100];
        let mut cursor = io::Cursor::new(&data);
        let mut buf = [0u8; 64];
        assert_eq!(read_fill(&mut cursor, &mut buf).unwrap(), 64);
        assert_eq!(read_fill(&mut cursor, &mut buf).unwrap(), 36);
        assert_eq!(read_fill(&mut cursor, &mut buf).unwrap(), 0);
    }
}
