//! Coordination queues for the scan pipeline.
//!
//! The pipeline stages talk to each other through three purpose-built
//! blocking queues rather than generic channels:
//!
//! - [`TreeQueue`]: work queue for directory traversal where the consumers
//!   are also the producers. It detects forest exhaustion by counting
//!   simultaneously idle workers.
//! - [`FileQueue`]: deduplicating queue that only releases records whose
//!   composite key has been observed at least twice.
//! - [`PairQueue`]: materializes every same-key pair for byte-level
//!   comparison while keeping at most one in-flight pair per left-side file.
//!
//! All `pop` operations take the shared cancellation flag and return `None`
//! once it is set; waits re-check the flag on a short interval so a stop
//! request is observed within a bounded delay.

pub mod file;
pub mod pair;
pub mod tree;

pub use file::FileQueue;
pub use pair::PairQueue;
pub use tree::TreeQueue;

use std::time::Duration;

/// Interval at which blocked `pop` calls re-check the cancellation flag.
pub(crate) const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
