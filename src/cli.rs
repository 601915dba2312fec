//! Command-line interface definitions.
//!
//! All options are defined with the clap derive API. The surface is flat:
//! one invocation describes one scan, and the operation mode follows from
//! which of `--compare-everything` / `--compare-to` is present (neither
//! means list mode). Cross-option validation lives in
//! [`crate::config::Config::from_cli`], not here.
//!
//! # Example
//!
//! ```bash
//! # List every .txt file under two trees
//! dupehunt --directories ~/docs ~/backup --filenames '.*\.txt'
//!
//! # Cluster duplicates by size and first-2K hash
//! dupehunt --directories ~/photos --filenames '.*\.(jpg|jpeg)' \
//!     --compare-everything --match-size --match-hash first --hash-size 2K
//!
//! # Find files embedding a reference blob, ignoring 0xAD bytes
//! dupehunt --directories /data --filenames '.*' \
//!     --compare-to header.bin --compare-content find --set-joker 0xAD
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
Typical use cases:

  List all .txt files under two trees:
    dupehunt --directories ~/temp ~/mystuff --filenames '.*\\.txt'

  List capture_<date>.jpg/.jpeg files that have at least one duplicate
  (fast approximate match on size and first-2K hash):
    dupehunt --directories ~/photos --filenames '^capture_\\d{6,8}\\.(jpg|jpeg)' \\
        --compare-everything --match-size --match-hash first --hash-size 2K

  List .exe/.src files with at least one byte-identical duplicate:
    dupehunt --directories ~/temp --filenames '.*\\.(exe|src)' \\
        --compare-everything --compare-content full

With --compare-everything and --compare-content full, size matching and
first-chunk hashing (4K) are enabled implicitly as a performance floor.";

/// Concurrent duplicate detection and masked content search.
///
/// DupeHunt walks the given directories, collects regular files whose
/// basename matches any of the given patterns, and then lists them,
/// clusters duplicates, or matches them against a reference file.
#[derive(Debug, Parser)]
#[command(name = "dupehunt")]
#[command(author, version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Directories to process
    #[arg(long = "directories", value_name = "DIR", num_args = 1.., required = true)]
    pub directories: Vec<PathBuf>,

    /// Filename patterns; a file qualifies when any pattern matches its
    /// whole basename
    #[arg(long = "filenames", value_name = "PATTERN", num_args = 1.., required = true)]
    pub filenames: Vec<String>,

    /// Match files on their basename
    #[arg(long = "match-filenames")]
    pub match_filenames: bool,

    /// Match files on their size
    #[arg(long = "match-size")]
    pub match_size: bool,

    /// Match files on a hash of their first or last bytes
    #[arg(long = "match-hash", value_enum, value_name = "MODE")]
    pub match_hash: Option<HashModeArg>,

    /// Chunk size for --match-hash (supports K/M/G/T suffixes and hex)
    #[arg(
        long = "hash-size",
        value_name = "SIZE",
        value_parser = parse_size,
        default_value = "4K"
    )]
    pub hash_size: u64,

    /// Compare file content: full equality, or where the --compare-to
    /// reference must appear (begin/end/find)
    #[arg(long = "compare-content", value_enum, value_name = "MODE")]
    pub compare_content: Option<ContentArg>,

    /// Match every file against this reference file's content
    #[arg(long = "compare-to", value_name = "FILE")]
    pub compare_to: Option<PathBuf>,

    /// Hexadecimal byte pattern treated as a wildcard wherever it occurs in
    /// the reference (e.g. 0x000000FF, high-order bytes first)
    #[arg(long = "set-joker", value_name = "HEX")]
    pub set_joker: Option<String>,

    /// Compare each file against every other file
    #[arg(long = "compare-everything")]
    pub compare_everything: bool,

    /// Output format for group results
    #[arg(
        long = "output-format",
        value_enum,
        value_name = "FORMAT",
        default_value_t = OutputFormatArg::Pipe
    )]
    pub output_format: OutputFormatArg,

    /// Worker threads per pipeline stage (default: a third of the CPUs)
    #[arg(long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and results
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Which end of each file the chunk hash covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HashModeArg {
    /// Hash the first N bytes
    First,
    /// Hash the last N bytes
    Last,
}

/// Content comparison modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentArg {
    /// Whole-content equality
    Full,
    /// Reference at the start of each file
    Begin,
    /// Reference at the end of each file
    End,
    /// Reference anywhere in each file
    Find,
}

/// Group rendering formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Header line per group, indented members
    Grouped,
    /// group<TAB>path lines
    Tsv,
    /// group|path lines
    Pipe,
}

/// Parse a size string into bytes.
///
/// Accepts decimal (`4096`), hex (`0x1000` or `400h`), and the binary
/// suffixes K/M/G/T (1024-based, so `2K` is 2048).
///
/// # Examples
///
/// ```
/// use dupehunt::cli::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("4K").unwrap(), 4096);
/// assert_eq!(parse_size("0x1000").unwrap(), 4096);
/// assert_eq!(parse_size("1000h").unwrap(), 4096);
/// assert_eq!(parse_size("1M").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error for empty strings, unknown suffixes, non-numeric
/// values, and values that overflow `u64`.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let mut text: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if text.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let mut multiplier: u64 = 1;
    let mut is_hex = false;

    let last = text
        .chars()
        .next_back()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or_default();
    if last.is_ascii_alphabetic() && !text.to_ascii_uppercase().starts_with("0X") {
        match last {
            'K' => multiplier = 1 << 10,
            'M' => multiplier = 1 << 20,
            'G' => multiplier = 1 << 30,
            'T' => multiplier = 1 << 40,
            'H' => is_hex = true,
            _ => return Err(format!("unknown size suffix '{last}'")),
        }
        text.pop();
    }

    let digits = if let Some(stripped) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
    {
        is_hex = true;
        stripped
    } else {
        text.as_str()
    };
    if digits.is_empty() {
        return Err(format!("invalid size value '{input}'"));
    }

    let value = if is_hex {
        u64::from_str_radix(digits, 16)
    } else {
        digits.parse::<u64>()
    }
    .map_err(|_| format!("invalid size value '{input}'"))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size value out of range '{input}'"))
}

/// Parse a hex byte string, high-order bytes first.
///
/// Accepts an optional `0x`/`0X` prefix or `h`/`H` suffix. The digit count
/// must be even and non-zero.
///
/// # Examples
///
/// ```
/// use dupehunt::cli::parse_hex_bytes;
///
/// assert_eq!(parse_hex_bytes("0xDEAD").unwrap(), vec![0xDE, 0xAD]);
/// assert_eq!(parse_hex_bytes("00ffh").unwrap(), vec![0x00, 0xFF]);
/// assert!(parse_hex_bytes("0xF").is_err());
/// ```
///
/// # Errors
///
/// Returns an error for empty input, odd digit counts, and non-hex digits.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>, String> {
    let digits = if let Some(stripped) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X"))
    {
        stripped
    } else if let Some(stripped) = input.strip_suffix('h').or_else(|| input.strip_suffix('H')) {
        stripped
    } else {
        input
    };

    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!(
            "hex string must have an even, non-zero number of digits: '{input}'"
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex digits in '{input}'"));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex digits in '{input}'"))
        })
        .collect()
}
