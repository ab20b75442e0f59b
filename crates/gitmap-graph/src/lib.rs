//! Object-graph reconstruction and simplification for gitmap.
//!
//! Given an [`ObjectQuery`](gitmap_odb::ObjectQuery) backend, this crate
//! rebuilds the typed object graph (commits, trees, blobs, annotated tags)
//! with lazily parsed relations, discovers everything reachable from the
//! selected refs, and assembles a display graph in which maximal runs of
//! uninteresting linear history are collapsed into summary nodes.
//!
//! The two entry points are [`discover`], which runs the reachability
//! pre-scan on its own, and [`build_graph`], which runs the full pipeline
//! and returns a [`DisplayGraph`].

mod builder;
mod collapse;
mod display;
mod error;
mod object;

pub use builder::{build_graph, discover, Discovery, GraphOptions, RefSelection, Seed, SeedOrigin};
pub use display::{DisplayEdge, DisplayGraph, DisplayNode, RefKind};
pub use error::GraphError;
pub use object::{
    AnnotatedTag, Blob, Commit, CommitRelations, GitObject, Link, ObjectArena, TagTarget, Tree,
    TreeEntry,
};

/// Result type for graph construction.
pub type Result<T> = std::result::Result<T, GraphError>;
