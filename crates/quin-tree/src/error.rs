//! Errors raised by tree construction, mutation and proof handling.

use thiserror::Error;

/// Errors produced by the quin tree engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Unsupported arity, non-positive depth, hasher width mismatch.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A leaf index outside `[0, len)`.
    #[error("Leaf index {index} out of range (tree holds {len} leaves)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A subroot range that is not an aligned, exact power of the arity.
    #[error("Invalid subroot range [{start}, {end}): {reason}")]
    InvalidSubrootRange {
        start: usize,
        end: usize,
        reason: &'static str,
    },

    /// A proof whose shape disagrees with its declared depth or arity.
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// A constituent tree that has not been opened yet.
    #[error("Tree number {tree_num} out of range ({num_trees} trees)")]
    TreeNumberOutOfRange { tree_num: usize, num_trees: usize },

    /// Text or binary decoding failure.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl TreeError {
    pub(crate) fn subroot(start: usize, end: usize, reason: &'static str) -> Self {
        Self::InvalidSubrootRange { start, end, reason }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<ark_serialize::SerializationError> for TreeError {
    fn from(e: ark_serialize::SerializationError) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<hex::FromHexError> for TreeError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Encoding(e.to_string())
    }
}
