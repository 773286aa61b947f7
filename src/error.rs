use thiserror::Error;

use crate::tree::Kind;

/// Result alias used by every path operation.
pub type Result<T> = std::result::Result<T, PathError>;

/// Coarse error category, for callers that only branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter had the wrong fundamental type.
    InvalidArgument,
    /// The value at the path did not have the shape the operation requires.
    InvalidShape,
}

/// An error raised by a path operation or by a direct container mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    /// Raised before any structural work begins; the input is untouched.
    #[error("{op} {reason}")]
    InvalidArgument { op: &'static str, reason: String },

    /// The value at `path` is not a sequence.
    #[error("{op} can only be used on arrays and {path} is not")]
    InvalidShape { op: &'static str, path: String },

    /// A segment addressed a sequence with something other than an index
    /// in `0..=len`.
    #[error("segment '{key}' is not a writable index for a sequence of length {len}")]
    InvalidIndex { key: String, len: usize },

    /// An in-place mutation reached a container that `deep_freeze` marked
    /// immutable.
    #[error("cannot modify a frozen {kind}")]
    Frozen { kind: Kind },
}

impl PathError {
    /// `op` was given a scalar where a mapping or sequence is required.
    pub fn not_an_object(op: &'static str) -> Self {
        PathError::InvalidArgument {
            op,
            reason: "first argument must be an object".to_string(),
        }
    }

    /// `op` found something other than a sequence at `path`.
    pub fn not_an_array(op: &'static str, path: &str) -> Self {
        PathError::InvalidShape {
            op,
            path: path.to_string(),
        }
    }

    /// The coarse category. `InvalidIndex` and `Frozen` count as shape
    /// errors: the container at hand cannot take the write.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PathError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            PathError::InvalidShape { .. }
            | PathError::InvalidIndex { .. }
            | PathError::Frozen { .. } => ErrorKind::InvalidShape,
        }
    }
}
