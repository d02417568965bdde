//! # batchflow
//!
//! Key-grouped, size-bounded write batching for single-pass streams.
//!
//! ## Overview
//!
//! This library turns a single-pass stream of write requests into a stream of
//! grouped write batches: requests that share a semantic key are coalesced
//! into one outbound operation, while memory stays bounded by capping how
//! many distinct groups may accumulate at once. When the cap is hit, the
//! least-recently-touched group is finalized and shipped to make room.
//!
//! ## Core Philosophy
//!
//! - **Policy-Driven**: what a statement is, how it groups, and what a batch
//!   becomes are injected through one seam, [`WriteProfile`]
//! - **Pull-Based**: the engine does nothing until the consumer asks for the
//!   next unit; it never over- or under-emits relative to its input
//! - **Bounded**: memory is capped at `max_open_groups` × per-group size cap,
//!   independent of stream length
//! - **Type-Safe**: items, statements, keys, and units are opaque caller
//!   types with strongly typed error propagation
//!
//! ## Quick Start
//!
//! ```rust
//! use batchflow::{profile_fn, GroupedBatcher, GroupingConfig, SizeLimit};
//!
//! fn main() -> batchflow::Result<()> {
//!     let profile = profile_fn(
//!         |item: u32| Ok(item),       // bind: item -> statement
//!         |statement| statement % 10, // key: equal keys share a batch
//!         |statements: &mut Vec<u32>| Ok(statements.drain(..).collect::<Vec<_>>()),
//!     );
//!
//!     let config = GroupingConfig::new()
//!         .with_max_open_groups(16)
//!         .with_size_limit(SizeLimit::Statements(32));
//!
//!     let mut batcher = GroupedBatcher::new(config, profile, vec![1, 11, 21, 2])?;
//!     while batcher.has_next() {
//!         let unit = batcher.next_unit()?;
//!         println!("batch of {} statements", unit.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`group`] | Grouping engine: accumulator, recency map, pull batcher |
//! | [`error`] | Unified error type and result alias |

pub mod group;

// Re-export main types for convenience
pub use group::{
    profile_fn, BatchAccumulator, FnProfile, GroupedBatcher, GroupingConfig, GroupingStats,
    RecencyKeyMap, SizeLimit, WriteProfile,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
