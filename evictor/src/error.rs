use evictor_utils::QuantityParseError;

use crate::model::Signal;

/// Errors that refuse construction of a [`crate::manager::EvictionManager`]
/// or a [`crate::model::Config`]. These are surfaced once, at startup, by
/// the hosting agent; they never occur once the control loop is running.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown eviction signal {0:?}")]
    UnknownSignal(String),

    #[error("unsupported operator {0:?} for signal {1:?}; only \"<\" is supported")]
    InvalidOperator(String, String),

    #[error("invalid quantity in threshold expression {0:?}: {1}")]
    InvalidQuantity(String, QuantityParseError),

    #[error("soft threshold grace period for {0:?} must be positive, got {1:?}")]
    NonPositiveGracePeriod(Signal, String),

    #[error("grace period given for signal {0:?} with no matching threshold expression")]
    GracePeriodWithoutThreshold(String),

    #[error("duplicate threshold for signal {0:?} with identical grace period")]
    DuplicateSignalSameGrace(Signal),

    #[error("malformed threshold expression {0:?}: expected SIGNAL<VALUE")]
    MalformedExpression(String),
}
