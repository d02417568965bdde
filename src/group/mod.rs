//! # Write Grouping Engine
//!
//! This module implements the grouping/eviction core: a single pass over an
//! upstream source of write requests is folded into key-grouped,
//! size-bounded batches, with the number of concurrently open groups capped
//! by evicting the least-recently-touched one.
//!
//! ## Data Flow
//!
//! ```text
//! Item → bind → Statement → key → RecencyKeyMap lookup
//!                                     │
//!                          BatchAccumulator add / evict
//!                                     │
//!                               assemble → OutboundUnit
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`WriteProfile`] | Injected policy seam: bind, key, weight, assemble |
//! | [`BatchAccumulator`] | Bounded, reusable holder of same-key statements |
//! | [`RecencyKeyMap`] | Bounded-by-caller map ordered by recency of touch |
//! | [`GroupedBatcher`] | Pull-driven state machine producing outbound units |
//! | [`GroupingConfig`] | Group-count cap and size limit configuration |
//! | [`SizeLimit`] | Count- or weight-based per-group size metric |
//!
//! ## Ordering
//!
//! Units that share no key reflect eviction order, not arrival order; a unit
//! for key K always folds in every K-statement seen up to the moment it is
//! produced. This is a deliberate throughput-over-ordering trade.

mod accumulator;
mod batcher;
mod recency;

pub use accumulator::BatchAccumulator;
pub use batcher::{
    profile_fn, FnProfile, GroupedBatcher, GroupingConfig, GroupingStats, SizeLimit,
};
pub use recency::RecencyKeyMap;

use crate::Result;
use std::hash::Hash;

/// Injected policy seam for a grouped write sink.
///
/// A profile decides everything the engine treats as opaque: how an input
/// item becomes a bindable statement, which statements belong together, how
/// much a statement weighs against the size limit, and what a finished group
/// of statements becomes on the way out.
pub trait WriteProfile {
    /// Raw input unit pulled from upstream; never interpreted by the engine.
    type Item;
    /// Bindable write statement, immutable once created.
    type Statement;
    /// Grouping key; statements with equal keys share one accumulator.
    /// Cloned into the recency index, so keep keys small.
    type Key: Eq + Hash + Clone;
    /// Assembled outbound unit, one per finalized batch.
    type Unit;

    /// Bind one input item into a statement.
    fn bind(&mut self, item: Self::Item) -> Result<Self::Statement>;

    /// Compute the grouping key for a statement.
    fn key(&self, statement: &Self::Statement) -> Self::Key;

    /// Weight of a statement against [`SizeLimit::Weight`] caps.
    ///
    /// Ignored under [`SizeLimit::Statements`], where every statement
    /// counts as one.
    fn weight(&self, _statement: &Self::Statement) -> usize {
        1
    }

    /// Assemble a finished group into an outbound unit.
    ///
    /// Implementations take the statements out of the vec (drain or take);
    /// the engine clears whatever remains and reuses the allocation for the
    /// next group. Whether a single-statement group becomes a pass-through
    /// unit is this policy's decision.
    fn assemble(&mut self, statements: &mut Vec<Self::Statement>) -> Result<Self::Unit>;
}
