//! DupeHunt - concurrent duplicate detection and masked content search.
//!
//! DupeHunt walks one or more directory trees looking for regular files whose
//! basename matches a set of patterns, then either lists them, clusters them
//! into equivalence groups under a composable matching relation (filename,
//! size, chunk hash, full content), or matches each of them against a single
//! reference file under a wildcard-byte mask.
//!
//! The engine is a four-stage thread pipeline built on three purpose-built
//! coordination queues ([`queue::TreeQueue`], [`queue::FileQueue`],
//! [`queue::PairQueue`]) and an online equivalence tracker
//! ([`groups::GroupHandler`]) that elides comparisons already decided by
//! earlier results.

pub mod cli;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod groups;
pub mod logging;
pub mod output;
pub mod queue;
pub mod scanner;
pub mod signal;
