//! Syntax tree model for the brace transpiler.
//!
//! A [`SyntaxTree`] is the hand-off point between a front-end and the
//! conversion pipeline in `brace-transpile`. Trees can be built three ways:
//!
//! - with the [`Node`] constructors (tests, plugins, embedding hosts),
//! - by deserializing JSON with [`SyntaxTree::from_json`],
//! - by a [`Reader`], such as the tree-sitter based Python reader.
//!
//! # Example
//!
//! ```ignore
//! use brace_syntax::{Node, SyntaxTree};
//!
//! let tree = SyntaxTree::new(Node::module(vec![
//!     Node::assign(Node::ident("x"), Node::int(1)),
//! ]))?;
//! assert_eq!(tree.body().len(), 1);
//! ```
//!
//! Every tree is validated on construction: the root is a `Module`, no node
//! appears twice, and statements and expressions sit where they belong.

pub mod input;
pub mod node;
pub mod registry;
pub mod traits;
pub mod tree;

// Re-exports: node model
pub use node::{
    BinOp, CmpOp, ComprehensionKind, DictEntry, Literal, Node, NodeId, NodeKind, Span, UnaryOp,
};
pub use tree::{MalformedTree, SyntaxTree, validate};

// Re-exports: readers
pub use registry::{reader_for_extension, reader_for_language, readers, register_reader};
pub use traits::{ReadError, Reader};

#[cfg(feature = "read-python")]
pub use input::{PYTHON_READER, PythonReader, read_python};
