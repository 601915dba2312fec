//! File discovery types and the composite matching key.
//!
//! The traversal stage produces [`FileRecord`]s for regular files whose
//! basename matches at least one configured pattern. Downstream stages
//! cluster records under a [`CompositeKey`], the tuple of attributes two
//! files must agree on before they are worth a byte-level comparison. A
//! single run uses exactly one key shape, chosen from which of filename,
//! size and chunk hash participate in the match.

pub mod hasher;

pub use hasher::{hash_file_chunk, HashError};

use std::io;
use std::path::PathBuf;

use regex::Regex;

/// A discovered regular file: its path and observed size.
///
/// Immutable once produced by the traversal stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes at discovery time
    pub size: u64,
}

impl FileRecord {
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    /// The file's basename as a string, lossily decoded.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The attribute tuple under which files are clustered.
///
/// One tagged type covers all seven shapes so queue and grouping storage
/// stays uniform; equality and hashing are derived lexicographically over
/// the fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompositeKey {
    Size(u64),
    Name(String),
    SizeName(u64, String),
    Hash(u64),
    SizeHash(u64, u64),
    NameHash(String, u64),
    SizeNameHash(u64, String, u64),
}

/// Build the composite key for `record` from the attributes taking part in
/// the match.
///
/// Returns `None` when no attribute is selected; such records bypass the
/// key discipline entirely (passthrough).
#[must_use]
pub fn composite_key(
    record: &FileRecord,
    match_size: bool,
    match_name: bool,
    hash: Option<u64>,
) -> Option<CompositeKey> {
    Some(match (match_size, match_name, hash) {
        (true, false, None) => CompositeKey::Size(record.size),
        (false, true, None) => CompositeKey::Name(record.file_name()),
        (true, true, None) => CompositeKey::SizeName(record.size, record.file_name()),
        (false, false, Some(hash)) => CompositeKey::Hash(hash),
        (true, false, Some(hash)) => CompositeKey::SizeHash(record.size, hash),
        (false, true, Some(hash)) => CompositeKey::NameHash(record.file_name(), hash),
        (true, true, Some(hash)) => {
            CompositeKey::SizeNameHash(record.size, record.file_name(), hash)
        }
        (false, false, None) => return None,
    })
}

/// Whether `name` matches any of the configured basename patterns.
///
/// Patterns are pre-anchored at compile time, so a match covers the whole
/// basename.
#[must_use]
pub fn matches_any(name: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(name))
}

/// Errors raised while walking a directory.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when reading a directory.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The directory disappeared between discovery and iteration.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// Any other I/O failure during iteration.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error against the path it occurred on.
    #[must_use]
    pub fn from_io(path: PathBuf, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
            io::ErrorKind::NotFound => ScanError::NotFound(path),
            _ => ScanError::Io {
                path,
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from("/data").join(name), size)
    }

    #[test]
    fn test_file_name_extraction() {
        assert_eq!(record("photo.jpg", 1).file_name(), "photo.jpg");
        assert_eq!(FileRecord::new(PathBuf::from("/"), 0).file_name(), "");
    }

    #[test]
    fn test_key_shapes_cover_all_combinations() {
        let r = record("a.bin", 42);

        assert_eq!(
            composite_key(&r, true, false, None),
            Some(CompositeKey::Size(42))
        );
        assert_eq!(
            composite_key(&r, false, true, None),
            Some(CompositeKey::Name("a.bin".into()))
        );
        assert_eq!(
            composite_key(&r, true, true, None),
            Some(CompositeKey::SizeName(42, "a.bin".into()))
        );
        assert_eq!(
            composite_key(&r, false, false, Some(7)),
            Some(CompositeKey::Hash(7))
        );
        assert_eq!(
            composite_key(&r, true, false, Some(7)),
            Some(CompositeKey::SizeHash(42, 7))
        );
        assert_eq!(
            composite_key(&r, false, true, Some(7)),
            Some(CompositeKey::NameHash("a.bin".into(), 7))
        );
        assert_eq!(
            composite_key(&r, true, true, Some(7)),
            Some(CompositeKey::SizeNameHash(42, "a.bin".into(), 7))
        );
        assert_eq!(composite_key(&r, false, false, None), None);
    }

    #[test]
    fn test_keys_with_equal_fields_are_equal() {
        let a = record("same.txt", 10);
        let b = FileRecord::new(PathBuf::from("/elsewhere/same.txt"), 10);
        assert_eq!(
            composite_key(&a, true, true, Some(3)),
            composite_key(&b, true, true, Some(3))
        );
    }

    #[test]
    fn test_different_shapes_never_compare_equal() {
        // Size(42) and Hash(42) carry the same scalar but are distinct keys.
        assert_ne!(CompositeKey::Size(42), CompositeKey::Hash(42));
    }

    #[test]
    fn test_matches_any_with_anchored_patterns() {
        let patterns = vec![
            Regex::new("^(?:.*\\.txt)$").unwrap(),
            Regex::new("^(?:data_\\d+)$").unwrap(),
        ];
        assert!(matches_any("notes.txt", &patterns));
        assert!(matches_any("data_42", &patterns));
        assert!(!matches_any("notes.txt.bak", &patterns));
        assert!(!matches_any("data_", &patterns));
        assert!(!matches_any("", &patterns));
    }

    #[test]
    fn test_scan_error_classification() {
        let err = ScanError::from_io(
            PathBuf::from("/p"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied(_)));

        let err = ScanError::from_io(
            PathBuf::from("/p"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScanError::NotFound(_)));

        let err = ScanError::from_io(
            PathBuf::from("/p"),
            io::Error::other("strange"),
        );
        assert!(matches!(err, ScanError::Io { .. }));
    }
}
