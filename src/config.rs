//! Run configuration and option validation.
//!
//! [`Config`] is the validated, engine-ready form of the command line. All
//! option-combination rules are enforced in [`Config::from_cli`] so the
//! engine never sees an inconsistent request; validation failures surface
//! as [`ConfigError`] before any worker thread starts.

use std::path::PathBuf;

use regex::Regex;

use crate::cli::Cli;

/// Default chunk size for `--match-hash`, in bytes.
pub const DEFAULT_HASH_SIZE: u64 = 4096;

/// How file content participates in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchContent {
    /// Content is not examined.
    None,
    /// Whole-content equality.
    Full,
    /// The reference must appear at the start of the candidate.
    Begin,
    /// The reference must appear at the end of the candidate.
    End,
    /// The reference may appear anywhere in the candidate.
    Find,
}

/// Which chunk of each file is hashed for pre-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// No chunk hashing.
    None,
    /// Hash the first N bytes.
    First,
    /// Hash the last N bytes.
    Last,
}

/// What the run does with the discovered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Print every match, one path per line.
    ListFiles,
    /// Match every file against a single reference file.
    CompareToFile,
    /// Cluster the matches into equivalence groups.
    AllVsAll,
}

/// How groups are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A header line per group, members indented below it.
    Grouped,
    /// One `group<TAB>path` line per member.
    Tsv,
    /// One `group|path` line per member.
    Pipe,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directories to traverse.
    pub directories: Vec<PathBuf>,
    /// Anchored basename patterns; a file qualifies if any matches.
    pub patterns: Vec<Regex>,
    /// Filenames participate in the composite key.
    pub match_filename: bool,
    /// Sizes participate in the composite key.
    pub match_size: bool,
    /// Content comparison mode.
    pub match_content: MatchContent,
    /// Chunk hashing mode.
    pub hash_mode: HashMode,
    /// Chunk size for hashing, in bytes.
    pub hash_size: u64,
    /// Byte pattern whose occurrences in the reference become wildcards.
    pub joker_bytes: Vec<u8>,
    /// What to do with the discovered files.
    pub operation_mode: OperationMode,
    /// How to render groups.
    pub output_format: OutputFormat,
    /// Reference file for compare-to-file mode.
    pub compare_to: Option<PathBuf>,
}

/// Invalid option combinations and malformed option values.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no directories specified")]
    NoDirectories,

    #[error("no filename patterns specified")]
    NoPatterns,

    #[error("invalid filename pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as given on the command line
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("--compare-everything and --compare-to cannot be used together")]
    ExclusiveModes,

    #[error("--set-joker requires --compare-to")]
    JokerWithoutReference,

    #[error("--compare-to requires --compare-content")]
    ReferenceWithoutContent,

    #[error(
        "--compare-everything requires at least one of --match-filenames, \
         --match-size, --match-hash or --compare-content"
    )]
    NothingToMatch,

    #[error("--compare-everything only supports --compare-content full")]
    ContentModeNotFull,

    #[error("invalid joker value: {0}")]
    InvalidJoker(String),
}

impl Config {
    /// Validate the parsed command line and build the run configuration.
    ///
    /// Also applies the all-vs-all/full-content performance floor: size
    /// matching and first-chunk hashing (at the default chunk size) are
    /// enabled implicitly, which narrows candidate pairs without changing
    /// the reported groups.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.directories.is_empty() {
            return Err(ConfigError::NoDirectories);
        }
        if cli.filenames.is_empty() {
            return Err(ConfigError::NoPatterns);
        }
        if cli.compare_everything && cli.compare_to.is_some() {
            return Err(ConfigError::ExclusiveModes);
        }
        if cli.set_joker.is_some() && cli.compare_to.is_none() {
            return Err(ConfigError::JokerWithoutReference);
        }
        if cli.compare_to.is_some() && cli.compare_content.is_none() {
            return Err(ConfigError::ReferenceWithoutContent);
        }
        if cli.compare_everything {
            let has_relation = cli.match_filenames
                || cli.match_size
                || cli.match_hash.is_some()
                || cli.compare_content.is_some();
            if !has_relation {
                return Err(ConfigError::NothingToMatch);
            }
            if cli
                .compare_content
                .is_some_and(|mode| mode != crate::cli::ContentArg::Full)
            {
                return Err(ConfigError::ContentModeNotFull);
            }
        }

        let patterns = compile_patterns(&cli.filenames)?;

        let joker_bytes = match &cli.set_joker {
            Some(joker) => {
                crate::cli::parse_hex_bytes(joker).map_err(ConfigError::InvalidJoker)?
            }
            None => Vec::new(),
        };

        let operation_mode = if cli.compare_everything {
            OperationMode::AllVsAll
        } else if cli.compare_to.is_some() {
            OperationMode::CompareToFile
        } else {
            OperationMode::ListFiles
        };

        let match_content = match cli.compare_content {
            None => MatchContent::None,
            Some(crate::cli::ContentArg::Full) => MatchContent::Full,
            Some(crate::cli::ContentArg::Begin) => MatchContent::Begin,
            Some(crate::cli::ContentArg::End) => MatchContent::End,
            Some(crate::cli::ContentArg::Find) => MatchContent::Find,
        };

        let mut hash_mode = match cli.match_hash {
            None => HashMode::None,
            Some(crate::cli::HashModeArg::First) => HashMode::First,
            Some(crate::cli::HashModeArg::Last) => HashMode::Last,
        };

        let mut match_size = cli.match_size;
        if operation_mode == OperationMode::AllVsAll && match_content == MatchContent::Full {
            // Performance floor: narrow the candidate pairs before the
            // quadratic comparison stage. Output is unaffected.
            if hash_mode == HashMode::None {
                hash_mode = HashMode::First;
            }
            match_size = true;
        }

        let output_format = match cli.output_format {
            crate::cli::OutputFormatArg::Grouped => OutputFormat::Grouped,
            crate::cli::OutputFormatArg::Tsv => OutputFormat::Tsv,
            crate::cli::OutputFormatArg::Pipe => OutputFormat::Pipe,
        };

        Ok(Self {
            directories: cli.directories.clone(),
            patterns,
            match_filename: cli.match_filenames,
            match_size,
            match_content,
            hash_mode,
            hash_size: cli.hash_size,
            joker_bytes,
            operation_mode,
            output_format,
            compare_to: cli.compare_to.clone(),
        })
    }
}

/// Compile basename patterns with full-match anchoring.
fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source: Box::new(source),
                }
            })
        })
        .collect()
}
