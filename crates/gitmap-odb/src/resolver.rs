//! Memoizing object resolver.
//!
//! Wraps an [`ObjectQuery`] so each identifier is fetched from the external
//! store at most once per kind of question. Object content is immutable once
//! written, so the caches never need invalidation.

use crate::{ObjectId, ObjectQuery, ObjectType, Result};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Resolver statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct ResolverStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of external queries issued.
    pub queries: u64,
    /// Number of cached type entries.
    pub cached_types: usize,
    /// Number of cached content entries.
    pub cached_contents: usize,
}

impl ResolverStats {
    /// Returns the cache hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct ResolverMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    queries: AtomicU64,
}

impl ResolverMetrics {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Memoizing resolver over an [`ObjectQuery`].
///
/// Type and content are cached independently: content is only fetched once
/// an object's relations are actually read, while types are needed for every
/// discovered id. Two concurrent misses for the same uncached id may both
/// query the store; the second insert is a no-op (at-least-once semantics).
pub struct Resolver<Q> {
    query: Q,
    types: RwLock<HashMap<ObjectId, ObjectType>>,
    contents: RwLock<HashMap<ObjectId, Bytes>>,
    metrics: ResolverMetrics,
}

impl<Q: ObjectQuery> Resolver<Q> {
    /// Creates a resolver over the given query capability.
    pub fn new(query: Q) -> Self {
        Self {
            query,
            types: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
            metrics: ResolverMetrics::default(),
        }
    }

    /// Returns the underlying query capability.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Returns the object's kind, querying the store on first access.
    pub fn resolve_type(&self, id: &ObjectId) -> Result<ObjectType> {
        if let Some(t) = self.types.read().get(id) {
            self.metrics.record_hit();
            return Ok(*t);
        }
        self.metrics.record_miss();

        self.metrics.record_query();
        let t = self.query.object_type(id)?;
        self.types.write().entry(*id).or_insert(t);
        Ok(t)
    }

    /// Returns the object's textual representation, querying on first access.
    pub fn resolve_content(&self, id: &ObjectId) -> Result<Bytes> {
        if let Some(content) = self.contents.read().get(id) {
            self.metrics.record_hit();
            return Ok(content.clone());
        }
        self.metrics.record_miss();

        self.metrics.record_query();
        let content = self.query.object_content(id)?;
        self.contents
            .write()
            .entry(*id)
            .or_insert_with(|| content.clone());
        Ok(content)
    }

    /// Returns current resolver statistics.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            queries: self.metrics.queries.load(Ordering::Relaxed),
            cached_types: self.types.read().len(),
            cached_contents: self.contents.read().len(),
        }
    }
}
