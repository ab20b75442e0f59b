//! The object-store query capability.
//!
//! [`ObjectQuery`] is the single interface through which the graph engine
//! reads a repository. How the answers are produced (an in-memory store,
//! a real object database, a subprocess) is the implementor's concern.

use crate::{ObjectId, ObjectType, Result};
use bytes::Bytes;
use std::sync::Arc;

/// The repository's current head: the commit it resolves to and the branch
/// it is on (`None` when detached).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    /// Commit the head resolves to.
    pub target: ObjectId,
    /// Short branch name, if the head is symbolic.
    pub branch: Option<String>,
}

/// A working-tree path identified against tracked content.
///
/// `blob_id` is the content hash of the file as it currently exists, so a
/// consumer can match it against blobs in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTreeEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// Hash of the file's current content.
    pub blob_id: ObjectId,
}

/// Snapshot of uncommitted repository state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkTreeStatus {
    /// Tracked files whose working-tree content differs from the head.
    pub modified: Vec<WorkTreeEntry>,
    /// Tracked files staged in the index.
    pub staged: Vec<WorkTreeEntry>,
    /// Paths not tracked at all.
    pub untracked: Vec<String>,
}

/// Read-only query capability over a repository's object store.
pub trait ObjectQuery: Send + Sync {
    /// Lists every object id in the store, independent of reachability.
    fn list_object_ids(&self) -> Result<Vec<ObjectId>>;

    /// Returns the kind of the object with the given id.
    fn object_type(&self, id: &ObjectId) -> Result<ObjectType>;

    /// Returns the object's textual representation.
    fn object_content(&self, id: &ObjectId) -> Result<Bytes>;

    /// Lists all refs as `(name, target)` pairs, symbolic refs resolved.
    /// The head pseudo-ref is not included; see [`ObjectQuery::head`].
    fn list_refs(&self) -> Result<Vec<(String, ObjectId)>>;

    /// Returns the current head.
    fn head(&self) -> Result<Head>;

    /// Reports uncommitted working-tree state.
    ///
    /// Optional capability: stores without working-tree visibility
    /// return `None`.
    fn work_tree_status(&self) -> Result<Option<WorkTreeStatus>> {
        Ok(None)
    }
}

impl<T: ObjectQuery> ObjectQuery for Arc<T> {
    fn list_object_ids(&self) -> Result<Vec<ObjectId>> {
        (**self).list_object_ids()
    }

    fn object_type(&self, id: &ObjectId) -> Result<ObjectType> {
        (**self).object_type(id)
    }

    fn object_content(&self, id: &ObjectId) -> Result<Bytes> {
        (**self).object_content(id)
    }

    fn list_refs(&self) -> Result<Vec<(String, ObjectId)>> {
        (**self).list_refs()
    }

    fn head(&self) -> Result<Head> {
        (**self).head()
    }

    fn work_tree_status(&self) -> Result<Option<WorkTreeStatus>> {
        (**self).work_tree_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_arc_forwarding() {
        let store = Arc::new(MemoryStore::new());
        let blob = store.put_blob(b"content".as_ref());

        // Call through the Arc impl, not the store's own impl.
        assert_eq!(
            <Arc<MemoryStore> as ObjectQuery>::list_object_ids(&store).unwrap(),
            vec![blob]
        );
        assert_eq!(
            <Arc<MemoryStore> as ObjectQuery>::object_type(&store, &blob).unwrap(),
            ObjectType::Blob
        );
    }

    #[test]
    fn test_work_tree_status_default() {
        struct Empty;
        impl ObjectQuery for Empty {
            fn list_object_ids(&self) -> Result<Vec<ObjectId>> {
                Ok(vec![])
            }
            fn object_type(&self, id: &ObjectId) -> Result<ObjectType> {
                Err(crate::OdbError::UnresolvableObject(id.to_hex()))
            }
            fn object_content(&self, id: &ObjectId) -> Result<Bytes> {
                Err(crate::OdbError::UnresolvableObject(id.to_hex()))
            }
            fn list_refs(&self) -> Result<Vec<(String, ObjectId)>> {
                Ok(vec![])
            }
            fn head(&self) -> Result<Head> {
                Err(crate::OdbError::RefNotFound("HEAD".to_string()))
            }
        }

        assert_eq!(Empty.work_tree_status().unwrap(), None);
    }
}
