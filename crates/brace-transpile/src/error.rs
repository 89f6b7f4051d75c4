//! Fatal conversion errors.

use brace_syntax::{MalformedTree, ReadError, Span};

/// A failure that aborts a conversion with no partial output.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The supplied tree violates a structural invariant.
    #[error("malformed input: {message} (at {span})")]
    MalformedInput { message: String, span: Span },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reader could not produce a tree from source text.
    #[error("failed to read source: {0}")]
    Read(ReadError),
}

impl From<MalformedTree> for ConvertError {
    fn from(err: MalformedTree) -> Self {
        ConvertError::MalformedInput {
            message: err.message,
            span: err.span,
        }
    }
}

impl From<ReadError> for ConvertError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Malformed(tree) => tree.into(),
            other => ConvertError::Read(other),
        }
    }
}

/// Failure to write or read a saved cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheFileError {
    #[error("cache file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache file format: {0}")]
    Format(#[from] serde_json::Error),
}
