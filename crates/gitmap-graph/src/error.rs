//! Graph engine error types.

use gitmap_odb::OdbError;
use thiserror::Error;

/// Errors raised while reconstructing or simplifying the object graph.
///
/// All variants are structural invariant violations of the repository and
/// are fatal for the current traversal; each carries the offending object id
/// to aid diagnosis.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A commit's content lacks a tree reference.
    #[error("commit {0} has no tree reference")]
    MissingTree(String),

    /// Content does not match the marker-line grammar for its type.
    #[error("malformed content in {id}: {detail}")]
    MalformedContent {
        /// Hex id of the offending object.
        id: String,
        /// What failed to parse.
        detail: String,
    },

    /// An object turned out to be a different kind than the traversal needs.
    #[error("object {id} is a {actual}, expected {expected}")]
    UnexpectedType {
        /// Hex id of the offending object.
        id: String,
        /// The kind the traversal required.
        expected: &'static str,
        /// The kind the store reported.
        actual: &'static str,
    },

    /// Object store error.
    #[error("object store error: {0}")]
    Odb(#[from] OdbError),
}

impl GraphError {
    pub(crate) fn malformed(id: &gitmap_odb::ObjectId, detail: impl Into<String>) -> Self {
        Self::MalformedContent {
            id: id.to_hex(),
            detail: detail.into(),
        }
    }
}
