use thiserror::Error;

/// Unified error type for the batching engine.
///
/// Engine-owned failures are the construction-time configuration check and
/// the pull-after-exhaustion protocol violation. Everything else — failures
/// raised by the injected binder or assembler — passes through [`Error::Policy`]
/// unchanged, with the original error preserved as the source.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid construction-time configuration; no items were processed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// `next_unit` was called after the sequence was fully drained.
    ///
    /// Callers holding to the pull protocol never see this: `has_next`
    /// returning `false` means the next pull fails with this variant.
    #[error("Batch stream exhausted: no units remain")]
    Exhausted,

    /// Failure raised by an injected policy (binder or assembler),
    /// propagated without retries or suppression.
    #[error(transparent)]
    Policy(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Construct a configuration error with the given message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a policy-raised error for propagation through the engine.
    pub fn policy(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Policy(Box::new(source))
    }
}
