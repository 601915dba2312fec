//! The scan pipeline driver.
//!
//! [`Engine`] wires the coordination queues into a four-stage thread
//! pipeline:
//!
//! 1. **Collectors** pop directories from the [`TreeQueue`], push
//!    subdirectories back, and route matching regular files by operation
//!    mode: straight to the results (list mode), through a reference
//!    pre-filter into the [`FileQueue`] (compare-to-file mode), or keyed
//!    into the [`FileQueue`] (all-vs-all mode).
//! 2. **Hashers** (all-vs-all) pop candidate records, extend their key with
//!    an optional chunk hash, and push into the [`PairQueue`].
//! 3. **Comparers** (all-vs-all with content matching) pop candidate pairs,
//!    skip the ones the [`GroupHandler`] has already decided, byte-compare
//!    the rest, and feed the verdicts back as equivalence facts.
//! 4. **Flexible comparers** (compare-to-file) run the masked prefix /
//!    suffix / find comparison and collect matches.
//!
//! Workers block only in their upstream queue's `pop`. The last worker to
//! exit a stage propagates end-of-input downstream with `set_finished`,
//! decided by an atomic decrement at worker exit rather than a supervisor.
//! A shared cancellation flag drains the whole pipeline within a bounded
//! delay; results recorded before the stop are kept.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::compare::{self, MaskedPattern, Verdict};
use crate::config::{Config, HashMode, MatchContent, OperationMode};
use crate::groups::{GroupHandler, GroupId};
use crate::queue::{FileQueue, PairQueue, TreeQueue};
use crate::scanner::{self, hash_file_chunk, CompositeKey, FileRecord, ScanError};

/// Worker pool sizes and the streaming buffer size.
#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    /// Directory traversal workers.
    pub collectors: usize,
    /// Key/hash computation workers.
    pub hashers: usize,
    /// Byte comparison workers.
    pub comparers: usize,
    /// Chunk size for streaming reads and the find-mode window base.
    pub buffer_size: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self::balanced(
            thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        )
    }
}

impl ThreadConfig {
    /// Split `total` threads evenly across the three stages, at least one
    /// each.
    #[must_use]
    pub fn balanced(total: usize) -> Self {
        let per_stage = (total / 3).max(1);
        Self {
            collectors: per_stage,
            hashers: per_stage,
            comparers: per_stage,
            buffer_size: compare::DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Fatal engine failures; everything per-file is logged instead.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The compare-to-file reference could not be loaded.
    #[error("failed to read reference file {path}: {source}")]
    Reference {
        /// The reference path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Compare-to-file mode without a reference path.
    #[error("compare-to-file mode requires a reference file")]
    MissingReference,
}

/// The final result of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Matched paths (list and compare-to-file modes).
    Files(Vec<PathBuf>),
    /// Equivalence groups of size >= 2 (all-vs-all mode).
    Groups(HashMap<GroupId, Vec<PathBuf>>),
}

/// Everything the reference pre-filter and masked comparison need.
#[derive(Debug)]
struct Reference {
    name: String,
    size: u64,
    chunk_hash: Option<u64>,
    pattern: MaskedPattern,
}

struct Shared {
    config: Config,
    dir_queue: TreeQueue<PathBuf>,
    file_queue: FileQueue<CompositeKey, FileRecord>,
    pair_queue: PairQueue<CompositeKey, PathBuf>,
    group_handler: GroupHandler<PathBuf>,
    results: Mutex<Vec<PathBuf>>,
    cancel: Arc<AtomicBool>,
    active_collectors: AtomicUsize,
    active_hashers: AtomicUsize,
    reference: Option<Reference>,
    buffer_size: usize,
}

/// Pipeline driver: owns the queues and the worker threads of one run.
pub struct Engine {
    shared: Arc<Shared>,
    threads: ThreadConfig,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Build an engine for a validated configuration.
    ///
    /// In compare-to-file mode the reference file is loaded here; failing
    /// to read it is fatal.
    pub fn new(
        config: Config,
        threads: ThreadConfig,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, EngineError> {
        let reference = if config.operation_mode == OperationMode::CompareToFile {
            Some(load_reference(&config)?)
        } else {
            None
        };

        let shared = Arc::new(Shared {
            dir_queue: TreeQueue::new(threads.collectors.max(1)),
            file_queue: FileQueue::new(),
            pair_queue: PairQueue::new(),
            group_handler: GroupHandler::new(),
            results: Mutex::new(Vec::new()),
            cancel,
            active_collectors: AtomicUsize::new(0),
            active_hashers: AtomicUsize::new(0),
            reference,
            buffer_size: threads.buffer_size.max(1),
            config,
        });

        Ok(Self {
            shared,
            threads,
            workers: Vec::new(),
        })
    }

    /// Seed the traversal queue and spawn the worker pools.
    ///
    /// Roots that do not exist or are not directories are reported and
    /// skipped; the run proceeds with whatever remains.
    pub fn start(&mut self) {
        for root in &self.shared.config.directories {
            match fs::metadata(root) {
                Ok(meta) if meta.is_dir() => self.shared.dir_queue.push(root.clone()),
                Ok(_) => log::warn!("not a directory: {}", root.display()),
                Err(_) => log::warn!("directory does not exist: {}", root.display()),
            }
        }

        let collectors = self.threads.collectors.max(1);
        self.shared
            .active_collectors
            .store(collectors, Ordering::SeqCst);
        for _ in 0..collectors {
            let shared = Arc::clone(&self.shared);
            self.workers.push(thread::spawn(move || collect_files(&shared)));
        }

        match self.shared.config.operation_mode {
            OperationMode::ListFiles => {}
            OperationMode::AllVsAll => {
                let hashers = self.threads.hashers.max(1);
                self.shared.active_hashers.store(hashers, Ordering::SeqCst);
                for _ in 0..hashers {
                    let shared = Arc::clone(&self.shared);
                    self.workers.push(thread::spawn(move || hash_files(&shared)));
                }

                if self.shared.config.match_content != MatchContent::None {
                    for _ in 0..self.threads.comparers.max(1) {
                        let shared = Arc::clone(&self.shared);
                        self.workers
                            .push(thread::spawn(move || compare_pairs(&shared)));
                    }
                }
            }
            OperationMode::CompareToFile => {
                for _ in 0..self.threads.comparers.max(1) {
                    let shared = Arc::clone(&self.shared);
                    self.workers
                        .push(thread::spawn(move || compare_to_reference(&shared)));
                }
            }
        }
    }

    /// Flip the shared cancellation flag; the pipeline drains cooperatively.
    pub fn request_stop(&self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
    }

    /// Join every worker thread.
    pub fn wait_for_finish(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("a worker thread panicked");
            }
        }
    }

    /// Collect the run's results. Call after [`Engine::wait_for_finish`].
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        match self.shared.config.operation_mode {
            OperationMode::ListFiles | OperationMode::CompareToFile => {
                RunOutcome::Files(self.shared.results.lock().unwrap().clone())
            }
            OperationMode::AllVsAll => {
                let groups = if self.shared.config.match_content != MatchContent::None {
                    self.shared.group_handler.build_grouped_list()
                } else {
                    self.shared
                        .pair_queue
                        .build_grouped_list()
                        .into_iter()
                        .filter(|(_, members)| members.len() > 1)
                        .collect()
                };
                RunOutcome::Groups(groups)
            }
        }
    }
}

fn load_reference(config: &Config) -> Result<Reference, EngineError> {
    let path = config.compare_to.as_ref().ok_or(EngineError::MissingReference)?;

    let data = fs::read(path).map_err(|source| EngineError::Reference {
        path: path.clone(),
        source,
    })?;
    let size = data.len() as u64;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let chunk_hash = match config.hash_mode {
        HashMode::None => None,
        mode => Some(
            hash_file_chunk(path, size, config.hash_size, mode == HashMode::First).map_err(
                |e| EngineError::Reference {
                    path: path.clone(),
                    source: std::io::Error::other(e.to_string()),
                },
            )?,
        ),
    };

    Ok(Reference {
        name,
        size,
        chunk_hash,
        pattern: MaskedPattern::new(data, &config.joker_bytes),
    })
}

/// Collector stage: traverse directories, route matching files.
fn collect_files(shared: &Shared) {
    while let Some(dir) = shared.dir_queue.pop(&shared.cancel) {
        if let Err(e) = scan_directory(shared, &dir) {
            log::warn!("skipping directory {}: {e}", dir.display());
        }
    }

    if shared.active_collectors.fetch_sub(1, Ordering::SeqCst) == 1 {
        shared.file_queue.set_finished();
    }
}

fn scan_directory(shared: &Shared, dir: &Path) -> Result<(), ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir.to_path_buf(), e))?;

    for entry in entries {
        if shared.cancel.load(Ordering::SeqCst) {
            return Ok(());
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("error iterating {}: {e}", dir.display());
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                log::warn!("cannot stat {}: {e}", entry.path().display());
                continue;
            }
        };

        if file_type.is_dir() {
            shared.dir_queue.push(entry.path());
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if !scanner::matches_any(&name, &shared.config.patterns) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("cannot stat {}: {e}", entry.path().display());
                continue;
            }
        };
        let record = FileRecord::new(entry.path(), size);

        match shared.config.operation_mode {
            OperationMode::ListFiles => {
                shared.results.lock().unwrap().push(record.path);
            }
            OperationMode::CompareToFile => {
                if passes_reference_filter(shared, &record, &name) {
                    shared.file_queue.push_passthrough(record);
                }
            }
            OperationMode::AllVsAll => {
                // Keys here use only the cheap attributes; hashing waits
                // until the dedup queue has confirmed a second occurrence.
                match scanner::composite_key(
                    &record,
                    shared.config.match_size,
                    shared.config.match_filename,
                    None,
                ) {
                    Some(key) => shared.file_queue.push(key, record),
                    None => shared.file_queue.push_passthrough(record),
                }
            }
        }
    }

    Ok(())
}

/// Cheap rejections against the reference before a candidate is queued.
fn passes_reference_filter(shared: &Shared, record: &FileRecord, name: &str) -> bool {
    let Some(reference) = &shared.reference else {
        return false;
    };

    if record.size < reference.size {
        return false;
    }
    if shared.config.match_content == MatchContent::Full && record.size != reference.size {
        return false;
    }
    if shared.config.match_size && record.size != reference.size {
        return false;
    }
    if shared.config.match_filename && name != reference.name {
        return false;
    }
    if shared.config.hash_mode != HashMode::None {
        let from_start = shared.config.hash_mode == HashMode::First;
        match hash_file_chunk(&record.path, record.size, shared.config.hash_size, from_start) {
            Ok(hash) => {
                if Some(hash) != reference.chunk_hash {
                    return false;
                }
            }
            Err(e) => {
                log::warn!("failed to hash {}: {e}", record.path.display());
                return false;
            }
        }
    }
    true
}

/// Hash stage: extend keys with the chunk hash and emit candidate pairs.
fn hash_files(shared: &Shared) {
    let just_collect = shared.config.match_content == MatchContent::None;

    while let Some(record) = shared.file_queue.pop(&shared.cancel) {
        if shared.cancel.load(Ordering::SeqCst) {
            break;
        }

        let hash = match shared.config.hash_mode {
            HashMode::None => None,
            mode => {
                let from_start = mode == HashMode::First;
                match hash_file_chunk(
                    &record.path,
                    record.size,
                    shared.config.hash_size,
                    from_start,
                ) {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        log::warn!("failed to hash {}: {e}", record.path.display());
                        continue;
                    }
                }
            }
        };

        match scanner::composite_key(
            &record,
            shared.config.match_size,
            shared.config.match_filename,
            hash,
        ) {
            Some(key) => shared.pair_queue.push(key, record.path, just_collect),
            None => shared.pair_queue.push_passthrough(record.path),
        }
    }

    if shared.active_hashers.fetch_sub(1, Ordering::SeqCst) == 1 {
        shared.pair_queue.set_finished();
    }
}

/// Compare stage: confirm or refute candidate pairs, feed back facts.
fn compare_pairs(shared: &Shared) {
    while let Some(pair) = shared.pair_queue.pop(&shared.cancel) {
        if !shared.cancel.load(Ordering::SeqCst)
            && shared.group_handler.should_process(&pair.0, &pair.1)
        {
            match compare::compare_files(&pair.0, &pair.1, shared.buffer_size) {
                Ok(Verdict::Match) => shared.group_handler.add_same(&pair.0, &pair.1),
                Ok(Verdict::NoMatch) => shared.group_handler.add_different(&pair.0, &pair.1),
                Err(e) => log::warn!(
                    "error comparing {} and {}: {e}",
                    pair.0.display(),
                    pair.1.display()
                ),
            }
        }
        shared.pair_queue.set_processed(&pair);
    }

    log::debug!("comparison worker finished");
}

/// Flexible compare stage: masked match against the reference.
fn compare_to_reference(shared: &Shared) {
    let Some(reference) = &shared.reference else {
        log::error!("compare-to-file worker started without a reference");
        return;
    };

    while let Some(record) = shared.file_queue.pop(&shared.cancel) {
        if shared.cancel.load(Ordering::SeqCst) {
            break;
        }

        let verdict = match shared.config.match_content {
            MatchContent::Begin | MatchContent::Full => reference.pattern.match_prefix(&record.path),
            MatchContent::End => reference.pattern.match_suffix(&record.path),
            MatchContent::Find => reference.pattern.search_file(&record.path, shared.buffer_size),
            MatchContent::None => {
                unreachable!("compare-to-file mode always has a content mode")
            }
        };

        match verdict {
            Ok(Verdict::Match) => shared.results.lock().unwrap().push(record.path),
            Ok(Verdict::NoMatch) => {}
            Err(e) => log::warn!("error matching {}: {e}", record.path.display()),
        }
    }

    log::debug!("reference comparison worker finished");
}
