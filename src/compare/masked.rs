//! Masked byte comparison with wildcard positions.
//!
//! A [`MaskedPattern`] owns a reference buffer and a bitmask with one bit
//! per reference byte, packed into 64-bit words: bit `i` of word `w`
//! governs absolute byte `64*w + i`, least-significant bit first. A set bit
//! means the byte must equal the reference; a clear bit is a wildcard.
//! Bits past the end of the reference in the final word are always clear.
//!
//! The match kernel walks the reference in 64-byte chunks and picks one of
//! three paths per chunk based on its mask word: all-clear skips the chunk,
//! all-set compares the whole chunk as a slice, and anything else compares
//! the flagged bytes individually. Real masks are dominated by the two
//! uniform paths; the per-bit path serves the boundary word and sparse
//! wildcard regions.
//!
//! Wildcards are synthesized from a "joker" byte pattern: every
//! non-overlapping occurrence of the pattern in the reference clears the
//! covered bits.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use super::{read_fill, CompareError, Verdict};

/// A reference buffer plus per-byte wildcard mask.
#[derive(Debug, Clone)]
pub struct MaskedPattern {
    data: Vec<u8>,
    mask: Vec<u64>,
}

impl MaskedPattern {
    /// Build a pattern from reference bytes, treating every non-overlapping
    /// occurrence of `joker` as wildcard positions.
    ///
    /// An empty `joker`, or one longer than the reference, yields an
    /// all-must-match mask.
    #[must_use]
    pub fn new(data: Vec<u8>, joker: &[u8]) -> Self {
        let mask = synthesize_mask(&data, joker);
        Self { data, mask }
    }

    /// Build a pattern from an explicit mask.
    ///
    /// # Errors
    ///
    /// Fails when the mask has fewer words than the reference length
    /// requires.
    pub fn with_mask(data: Vec<u8>, mask: Vec<u64>) -> Result<Self, CompareError> {
        let needed = data.len().div_ceil(64);
        if mask.len() < needed {
            return Err(CompareError::MaskTooShort {
                words: mask.len(),
                needed,
            });
        }
        Ok(Self { data, mask })
    }

    /// Length of the reference buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the reference buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The packed mask words.
    #[must_use]
    pub fn mask(&self) -> &[u64] {
        &self.mask
    }

    /// Match the reference against the front of `window`.
    ///
    /// `window` must be at least as long as the reference.
    #[must_use]
    pub fn matches(&self, window: &[u8]) -> bool {
        let ref_len = self.data.len();
        debug_assert!(window.len() >= ref_len);

        let blocks = ref_len.div_ceil(64);
        let mut pos = 0usize;
        for block in 0..blocks {
            let word = self.mask[block];
            if word == 0 {
                pos += 64;
                continue;
            }
            if word == u64::MAX {
                // A full word implies 64 in-bounds reference bytes: the
                // trailing-bit invariant keeps the boundary word partial.
                if window[pos..pos + 64] != self.data[pos..pos + 64] {
                    return false;
                }
                pos += 64;
            } else {
                let count = (ref_len - pos).min(64);
                for bit in 0..count {
                    if (word >> bit) & 1 == 1 && self.data[pos] != window[pos] {
                        return false;
                    }
                    pos += 1;
                }
            }
        }
        true
    }

    /// Search `haystack` for any window matching the reference.
    #[must_use]
    pub fn search(&self, haystack: &[u8]) -> bool {
        if haystack.len() < self.data.len() {
            return false;
        }
        let last_start = haystack.len() - self.data.len();
        (0..=last_start).any(|start| self.matches(&haystack[start..]))
    }

    /// Match the reference against the first `len()` bytes of `path`.
    ///
    /// Files shorter than the reference do not match.
    pub fn match_prefix(&self, path: &Path) -> Result<Verdict, CompareError> {
        self.match_edge(path, false)
    }

    /// Match the reference against the last `len()` bytes of `path`.
    ///
    /// Files shorter than the reference do not match.
    pub fn match_suffix(&self, path: &Path) -> Result<Verdict, CompareError> {
        self.match_edge(path, true)
    }

    fn match_edge(&self, path: &Path, at_end: bool) -> Result<Verdict, CompareError> {
        if self.data.is_empty() {
            return Ok(Verdict::Match);
        }

        let mut file = open(path)?;
        let file_size = file
            .metadata()
            .map_err(|source| CompareError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let ref_len = self.data.len() as u64;
        if file_size < ref_len {
            return Ok(Verdict::NoMatch);
        }

        if at_end {
            file.seek(SeekFrom::End(-(ref_len as i64)))
                .map_err(|source| CompareError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        let mut buffer = vec![0u8; self.data.len()];
        let filled = read_fill(&mut file, &mut buffer).map_err(|source| CompareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if filled < buffer.len() {
            return Err(CompareError::ShortRead {
                path: path.to_path_buf(),
                expected: ref_len,
                actual: filled as u64,
            });
        }

        if self.matches(&buffer) {
            Ok(Verdict::Match)
        } else {
            Ok(Verdict::NoMatch)
        }
    }

    /// Search the whole of `path` for a window matching the reference.
    ///
    /// Reads through a sliding buffer of `base_buffer + len() - 1` bytes;
    /// between refills the final `len() - 1` bytes move to the front so
    /// windows spanning a refill boundary are still seen. Any
    /// `base_buffer >= 1` finds every match; larger values just amortize
    /// read calls.
    pub fn search_file(&self, path: &Path, base_buffer: usize) -> Result<Verdict, CompareError> {
        if self.data.is_empty() {
            return Ok(Verdict::Match);
        }

        let mut file = open(path)?;
        let overlap = self.data.len() - 1;
        let base = base_buffer.max(1);
        let mut buffer = vec![0u8; base + overlap];

        let io_err = |source| CompareError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut filled = read_fill(&mut file, &mut buffer).map_err(io_err)?;
        if filled < self.data.len() {
            return Ok(Verdict::NoMatch);
        }

        loop {
            if self.search(&buffer[..filled]) {
                return Ok(Verdict::Match);
            }
            if filled < buffer.len() {
                // EOF reached on the previous refill.
                return Ok(Verdict::NoMatch);
            }

            buffer.copy_within(filled - overlap.., 0);
            let refilled = read_fill(&mut file, &mut buffer[overlap..]).map_err(io_err)?;
            if refilled == 0 {
                return Ok(Verdict::NoMatch);
            }
            filled = overlap + refilled;
        }
    }
}

fn open(path: &Path) -> Result<File, CompareError> {
    File::open(path).map_err(|source| CompareError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the packed wildcard mask for `data` from a joker byte pattern.
///
/// The mask starts all-ones (with trailing padding bits cleared), then each
/// non-overlapping occurrence of `pattern`, scanned left to right with the
/// scan position advancing past every match, clears its covered bits.
fn synthesize_mask(data: &[u8], pattern: &[u8]) -> Vec<u64> {
    let words = data.len().div_ceil(64);
    let mut mask = vec![u64::MAX; words];

    let leftover = data.len() % 64;
    if leftover > 0 {
        if let Some(last) = mask.last_mut() {
            *last &= (1u64 << leftover) - 1;
        }
    }

    if pattern.is_empty() || pattern.len() > data.len() {
        return mask;
    }

    let mut pos = 0usize;
    while pos + pattern.len() <= data.len() {
        if &data[pos..pos + pattern.len()] == pattern {
            for cleared in pos..pos + pattern.len() {
                mask[cleared / 64] &= !(1u64 << (cleared % 64));
            }
            pos += pattern.len();
        } else {
            pos += 1;
        }
    }

    mask
}
