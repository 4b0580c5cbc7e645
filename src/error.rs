use thiserror::Error;

use crate::position::{Direction, Position};

/// Errors crossing the public API boundary, per spec.md §7.
///
/// `CollapseFailed` is the one "expected" exceptional flow: the `Collapser`
/// always catches it internally and recovers via backtracking. It is only
/// ever visible to a caller wrapped inside [`WfcError::GenerationFailed`].
#[derive(Debug, Error)]
pub enum WfcError {
    /// Propagation or selection emptied a slot's candidate set.
    #[error("collapse failed at {position:?}: candidate set became empty")]
    CollapseFailed { position: Position },

    /// The catalog has a module that can never be supported from some direction.
    #[error("catalog invalid: module {module} has no supporters on direction {direction:?}")]
    CatalogInvalid { module: usize, direction: Direction },

    /// A caller violated a documented precondition (assertion failure, not a
    /// recoverable runtime condition).
    #[error("illegal collapse operation: {reason}")]
    IllegalCollapse { reason: String },

    /// An observer requested cancellation.
    #[error("generation cancelled")]
    Cancelled,

    /// Backtracking exhausted the History without finding a valid continuation.
    #[error("generation failed: history exhausted during backtracking")]
    GenerationFailed,

    #[error("failed to read catalog/config file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog/config YAML")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, WfcError>;
