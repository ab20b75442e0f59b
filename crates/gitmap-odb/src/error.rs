//! Object database error types.

use thiserror::Error;

/// Errors raised at the object-store boundary.
///
/// None of these are recoverable by the graph engine: a dangling identifier
/// or an unknown object kind indicates a corrupt or unexpectedly-pruned
/// repository, so they propagate to the caller unchanged.
#[derive(Debug, Error)]
pub enum OdbError {
    /// An identifier has no corresponding object in the store.
    #[error("unresolvable object: {0}")]
    UnresolvableObject(String),

    /// The store reported a type outside the known object kinds.
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    /// A malformed object identifier.
    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// The named reference does not exist.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// A reference that cannot be resolved to an object.
    #[error("invalid ref: {0}")]
    InvalidRef(String),
}
