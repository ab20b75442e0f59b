//! Object database access for gitmap.
//!
//! This crate defines the boundary between the graph engine and a
//! repository's object store: content identifiers, the [`ObjectQuery`]
//! capability trait through which the store is consulted, an in-memory
//! store implementation, and the memoizing [`Resolver`] that guarantees
//! one external query per identifier.

mod error;
mod object;
mod query;
mod resolver;
mod store;

pub use error::OdbError;
pub use object::{ObjectId, ObjectType};
pub use query::{Head, ObjectQuery, WorkTreeEntry, WorkTreeStatus};
pub use resolver::{Resolver, ResolverStats};
pub use store::{MemoryStore, RefStore, Reference};

/// Result type for object database operations.
pub type Result<T> = std::result::Result<T, OdbError>;
