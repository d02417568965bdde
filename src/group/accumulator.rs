//! Batch accumulator.

/// Bounded, reusable holder of same-key statements.
///
/// Tracks an ordered statement sequence plus a running size. The size metric
/// is whatever the caller feeds in as per-statement weight — statement count
/// when every weight is 1, byte weight otherwise — compared against a cap
/// fixed at construction.
///
/// The cap is enforced by [`try_add`](Self::try_add) only; a
/// [`force_add`](Self::force_add) into an empty accumulator may leave the
/// running size above the cap so that a single oversized statement still
/// makes progress instead of wedging the pipeline.
#[derive(Debug)]
pub struct BatchAccumulator<S> {
    statements: Vec<S>,
    size: usize,
    cap: usize,
}

impl<S> BatchAccumulator<S> {
    /// Create an empty accumulator with the given size cap.
    pub fn new(cap: usize) -> Self {
        Self {
            statements: Vec::new(),
            size: 0,
            cap,
        }
    }

    /// Append a statement if the running size stays within the cap.
    ///
    /// On rejection the accumulator is untouched and the statement is handed
    /// back in `Err` so the caller can finalize and force-insert it without
    /// cloning.
    pub fn try_add(&mut self, statement: S, weight: usize) -> Result<(), S> {
        if self.size + weight > self.cap {
            return Err(statement);
        }
        self.statements.push(statement);
        self.size += weight;
        Ok(())
    }

    /// Append a statement unconditionally.
    ///
    /// The engine only calls this on an empty accumulator, where exceeding
    /// the cap is the documented escape hatch for oversized statements.
    pub fn force_add(&mut self, statement: S, weight: usize) {
        self.statements.push(statement);
        self.size += weight;
    }

    /// Reset to empty, retaining the cap and the backing allocation so the
    /// slot can be refilled under a new key without reallocating.
    pub fn clear(&mut self) {
        self.statements.clear();
        self.size = 0;
    }

    /// Number of statements currently held.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the accumulator holds no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Running size under the configured metric.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Configured size cap.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Backing statement sequence, handed to the assembler during
    /// finalization. The caller clears the accumulator right after.
    pub(crate) fn statements_mut(&mut self) -> &mut Vec<S> {
        &mut self.statements
    }
}
