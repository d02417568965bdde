//! Grouped batch builder.

use super::{BatchAccumulator, RecencyKeyMap, WriteProfile};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::iter::Peekable;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Per-group size metric and cap.
///
/// The accumulator only ever compares a running size against a cap; this
/// enum decides what that size measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeLimit {
    /// Cap on the number of statements per group.
    Statements(usize),
    /// Cap on accumulated statement weight per group, with weights supplied
    /// by [`WriteProfile::weight`].
    Weight(usize),
}

impl SizeLimit {
    /// The cap value, regardless of metric.
    pub fn cap(&self) -> usize {
        match *self {
            SizeLimit::Statements(cap) | SizeLimit::Weight(cap) => cap,
        }
    }
}

/// Configuration for a [`GroupedBatcher`], fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Upper bound on concurrently accumulating groups; the primary memory
    /// bound. Must be positive.
    pub max_open_groups: usize,
    /// Per-group size metric and cap.
    pub size_limit: SizeLimit,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_open_groups: 64,
            size_limit: SizeLimit::Statements(100),
        }
    }
}

impl GroupingConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_open_groups(mut self, n: usize) -> Self {
        self.max_open_groups = n;
        self
    }
    pub fn with_size_limit(mut self, limit: SizeLimit) -> Self {
        self.size_limit = limit;
        self
    }
}

/// Monotonic counters describing a batcher's activity so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Upstream items bound into statements.
    pub statements_bound: u64,
    /// Outbound units handed to the consumer.
    pub units_emitted: u64,
    /// Groups finalized because the group-count cap forced an eviction.
    pub capacity_evictions: u64,
    /// Groups finalized because a same-key statement no longer fit.
    pub overflow_finalizes: u64,
}

/// Closure-backed [`WriteProfile`].
///
/// Builds a profile from `bind`/`key`/`assemble` closures for callers that
/// don't need a named policy type. Statement weight is fixed at 1, so pair
/// it with [`SizeLimit::Statements`]; weight-based sinks implement
/// [`WriteProfile`] directly.
pub struct FnProfile<B, K, A, I, S, G, U> {
    bind: B,
    key: K,
    assemble: A,
    _types: PhantomData<fn(I) -> (S, G, U)>,
}

/// Build a [`FnProfile`] from the three policy closures.
pub fn profile_fn<B, K, A, I, S, G, U>(bind: B, key: K, assemble: A) -> FnProfile<B, K, A, I, S, G, U>
where
    B: FnMut(I) -> Result<S>,
    K: Fn(&S) -> G,
    A: FnMut(&mut Vec<S>) -> Result<U>,
    G: Eq + Hash + Clone,
{
    FnProfile {
        bind,
        key,
        assemble,
        _types: PhantomData,
    }
}

impl<B, K, A, I, S, G, U> WriteProfile for FnProfile<B, K, A, I, S, G, U>
where
    B: FnMut(I) -> Result<S>,
    K: Fn(&S) -> G,
    A: FnMut(&mut Vec<S>) -> Result<U>,
    G: Eq + Hash + Clone,
{
    type Item = I;
    type Statement = S;
    type Key = G;
    type Unit = U;

    fn bind(&mut self, item: I) -> Result<S> {
        (self.bind)(item)
    }

    fn key(&self, statement: &S) -> G {
        (self.key)(statement)
    }

    fn assemble(&mut self, statements: &mut Vec<S>) -> Result<U> {
        (self.assemble)(statements)
    }
}

/// Pull-driven batch builder over an upstream source.
///
/// Each [`next_unit`](Self::next_unit) call consumes as many upstream items
/// as it takes to produce one outbound unit: items folding into open groups
/// produce nothing, while a full group or a capacity eviction ships a unit
/// immediately. Once upstream is dry, residual groups drain one per call,
/// oldest-touched first.
///
/// Strictly single-threaded and synchronous; the engine owns the group map
/// and every accumulator in it, and a consumer that stops pulling simply
/// drops the buffered groups — nothing has been handed to the assembler for
/// them, so nothing is half-shipped.
pub struct GroupedBatcher<P, I>
where
    P: WriteProfile,
    I: Iterator<Item = P::Item>,
{
    profile: P,
    upstream: Peekable<I>,
    groups: RecencyKeyMap<P::Key, BatchAccumulator<P::Statement>>,
    config: GroupingConfig,
    stats: GroupingStats,
}

impl<P, I> GroupedBatcher<P, I>
where
    P: WriteProfile,
    I: Iterator<Item = P::Item>,
{
    /// Create a batcher over `upstream`.
    ///
    /// Fails with [`Error::Configuration`] when `max_open_groups` is zero,
    /// before any item is processed.
    pub fn new<T>(config: GroupingConfig, profile: P, upstream: T) -> Result<Self>
    where
        T: IntoIterator<Item = P::Item, IntoIter = I>,
    {
        if config.max_open_groups == 0 {
            return Err(Error::configuration("max_open_groups must be positive"));
        }
        Ok(Self {
            profile,
            upstream: upstream.into_iter().peekable(),
            groups: RecencyKeyMap::with_capacity(config.max_open_groups),
            config,
            stats: GroupingStats::default(),
        })
    }

    /// Whether another unit can be produced: upstream still has items, or
    /// residual groups remain to flush.
    pub fn has_next(&mut self) -> bool {
        self.upstream.peek().is_some() || !self.groups.is_empty()
    }

    /// Number of groups currently accumulating. Never exceeds
    /// `max_open_groups`.
    pub fn open_groups(&self) -> usize {
        self.groups.len()
    }

    /// Activity counters.
    pub fn stats(&self) -> GroupingStats {
        self.stats
    }

    /// The configuration this batcher was built with.
    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Produce the next outbound unit.
    ///
    /// Returns [`Error::Exhausted`] once upstream is dry and every residual
    /// group has been flushed; it is a caller contract violation to pull
    /// past a `false` [`has_next`](Self::has_next). Errors raised by the
    /// profile propagate unchanged, and after an assembler failure the batch
    /// under construction is left unspecified.
    pub fn next_unit(&mut self) -> Result<P::Unit> {
        // Fold upstream items until one of them forces an emission. This is
        // an explicit loop: runs of items that land in open groups must not
        // grow the call stack.
        while let Some(item) = self.upstream.next() {
            let statement = self.profile.bind(item)?;
            self.stats.statements_bound += 1;
            let key = self.profile.key(&statement);
            let weight = match self.config.size_limit {
                SizeLimit::Statements(_) => 1,
                SizeLimit::Weight(_) => self.profile.weight(&statement),
            };

            match self.groups.get_mut(&key) {
                Some(batch) => match batch.try_add(statement, weight) {
                    Ok(()) => {
                        self.groups.touch(&key);
                        trace!(weight, open_groups = self.groups.len(), "statement accumulated");
                    }
                    Err(statement) => {
                        // Group is full: ship it, then reuse the cleared
                        // slot for the statement that did not fit.
                        let unit = finalize(&mut self.profile, batch)?;
                        batch.force_add(statement, weight);
                        self.groups.touch(&key);
                        self.stats.overflow_finalizes += 1;
                        self.stats.units_emitted += 1;
                        debug!(open_groups = self.groups.len(), "group overflowed, finalized");
                        return Ok(unit);
                    }
                },
                None => {
                    if self.groups.len() < self.config.max_open_groups {
                        let mut batch = BatchAccumulator::new(self.config.size_limit.cap());
                        batch.force_add(statement, weight);
                        self.groups.put(key, batch);
                        trace!(open_groups = self.groups.len(), "opened group");
                        continue;
                    }

                    // At capacity, and non-empty since max_open_groups is
                    // validated positive: evict the stalest group and reuse
                    // its accumulator for the new key.
                    let (_, mut evicted) = self
                        .groups
                        .pop_oldest()
                        .expect("map at positive capacity is non-empty");
                    let unit = finalize(&mut self.profile, &mut evicted)?;
                    evicted.force_add(statement, weight);
                    self.groups.put(key, evicted);
                    self.stats.capacity_evictions += 1;
                    self.stats.units_emitted += 1;
                    debug!(
                        open_groups = self.groups.len(),
                        "evicted least-recently-touched group"
                    );
                    return Ok(unit);
                }
            }
        }

        // Upstream is dry: flush residual groups one per call, oldest first.
        if let Some((_, mut batch)) = self.groups.pop_oldest() {
            let unit = finalize(&mut self.profile, &mut batch)?;
            self.stats.units_emitted += 1;
            debug!(remaining_groups = self.groups.len(), "flushed residual group");
            return Ok(unit);
        }

        Err(Error::Exhausted)
    }
}

/// Hand the batch's statements to the assembler, then clear the accumulator
/// so its slot and allocation can be reused.
fn finalize<P: WriteProfile>(
    profile: &mut P,
    batch: &mut BatchAccumulator<P::Statement>,
) -> Result<P::Unit> {
    let unit = profile.assemble(batch.statements_mut())?;
    batch.clear();
    Ok(unit)
}

impl<P, I> Iterator for GroupedBatcher<P, I>
where
    P: WriteProfile,
    I: Iterator<Item = P::Item>,
{
    type Item = Result<P::Unit>;

    /// Iterator view of the pull protocol: exhaustion becomes `None`, every
    /// other outcome of [`next_unit`](GroupedBatcher::next_unit) is passed
    /// through.
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_unit() {
            Err(Error::Exhausted) => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity profile: items are statements, the key is the statement
    /// value, a unit is the drained statement vec.
    fn identity() -> impl WriteProfile<Item = u32, Statement = u32, Key = u32, Unit = Vec<u32>> {
        profile_fn(
            |item: u32| Ok(item),
            |statement: &u32| *statement,
            |statements: &mut Vec<u32>| Ok(statements.drain(..).collect()),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = GroupingConfig::default();
        assert_eq!(config.max_open_groups, 64);
        assert_eq!(config.size_limit, SizeLimit::Statements(100));
    }

    #[test]
    fn test_config_builder() {
        let config = GroupingConfig::new()
            .with_max_open_groups(4)
            .with_size_limit(SizeLimit::Weight(1024));
        assert_eq!(config.max_open_groups, 4);
        assert_eq!(config.size_limit, SizeLimit::Weight(1024));
        assert_eq!(config.size_limit.cap(), 1024);
    }

    #[test]
    fn test_zero_max_open_groups_rejected() {
        let config = GroupingConfig::new().with_max_open_groups(0);
        let result = GroupedBatcher::new(config, identity(), vec![1u32]);
        assert!(matches!(
            result,
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_upstream_is_immediately_exhausted() {
        let mut batcher =
            GroupedBatcher::new(GroupingConfig::default(), identity(), Vec::<u32>::new()).unwrap();
        assert!(!batcher.has_next());
        assert!(matches!(batcher.next_unit(), Err(Error::Exhausted)));
    }

    #[test]
    fn test_same_key_statements_coalesce() {
        let config = GroupingConfig::new()
            .with_max_open_groups(4)
            .with_size_limit(SizeLimit::Statements(10));
        let mut batcher = GroupedBatcher::new(config, identity(), vec![7, 7, 7]).unwrap();

        assert!(batcher.has_next());
        assert_eq!(batcher.next_unit().unwrap(), vec![7, 7, 7]);
        assert!(!batcher.has_next());
    }

    #[test]
    fn test_overflow_forces_emission() {
        // Size cap 1: the second same-key statement cannot join the first.
        let config = GroupingConfig::new()
            .with_max_open_groups(4)
            .with_size_limit(SizeLimit::Statements(1));
        let mut batcher = GroupedBatcher::new(config, identity(), vec![1, 1]).unwrap();

        assert_eq!(batcher.next_unit().unwrap(), vec![1]);
        assert_eq!(batcher.next_unit().unwrap(), vec![1]);
        assert!(matches!(batcher.next_unit(), Err(Error::Exhausted)));

        let stats = batcher.stats();
        assert_eq!(stats.statements_bound, 2);
        assert_eq!(stats.units_emitted, 2);
        assert_eq!(stats.overflow_finalizes, 1);
        assert_eq!(stats.capacity_evictions, 0);
    }

    #[test]
    fn test_iterator_view_matches_pull_protocol() {
        let config = GroupingConfig::new()
            .with_max_open_groups(2)
            .with_size_limit(SizeLimit::Statements(2));
        let batcher = GroupedBatcher::new(config, identity(), vec![1, 1, 2, 2, 3]).unwrap();

        let units: Vec<Vec<u32>> = batcher.map(|unit| unit.unwrap()).collect();
        assert_eq!(units, vec![vec![1, 1], vec![2, 2], vec![3]]);
    }

    #[test]
    fn test_bind_error_propagates() {
        let profile = profile_fn(
            |item: u32| {
                if item == 13 {
                    Err(Error::policy(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "unlucky item",
                    )))
                } else {
                    Ok(item)
                }
            },
            |statement: &u32| *statement,
            |statements: &mut Vec<u32>| Ok(statements.drain(..).collect::<Vec<u32>>()),
        );
        let mut batcher =
            GroupedBatcher::new(GroupingConfig::default(), profile, vec![1, 13]).unwrap();

        let err = batcher.next_unit().unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
        assert_eq!(err.to_string(), "unlucky item");
    }

    #[test]
    fn test_assemble_error_propagates() {
        let profile = profile_fn(
            |item: u32| Ok(item),
            |statement: &u32| *statement,
            |_statements: &mut Vec<u32>| -> Result<Vec<u32>> {
                Err(Error::policy(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "assembler down",
                )))
            },
        );
        let config = GroupingConfig::new()
            .with_max_open_groups(2)
            .with_size_limit(SizeLimit::Statements(1));
        let mut batcher = GroupedBatcher::new(config, profile, vec![1, 1]).unwrap();

        // The overflow on the second statement triggers finalization, whose
        // failure surfaces unchanged.
        let err = batcher.next_unit().unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
    }
}
