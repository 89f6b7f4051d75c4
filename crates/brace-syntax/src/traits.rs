//! Reader trait: the seam where an external front-end hands over a tree.

use crate::tree::{MalformedTree, SyntaxTree};

/// Error that can occur when reading source code into a syntax tree.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported syntax at line {line}: {construct}")]
    Unsupported { construct: String, line: u32 },

    #[error(transparent)]
    Malformed(#[from] MalformedTree),
}

/// A reader parses source code into a validated [`SyntaxTree`].
pub trait Reader: Send + Sync {
    /// Language identifier (e.g., "python").
    fn language(&self) -> &'static str;

    /// File extensions this reader handles (e.g., &["py"]).
    fn extensions(&self) -> &'static [&'static str];

    /// Parse source code into a tree.
    fn read(&self, source: &str) -> Result<SyntaxTree, ReadError>;
}
