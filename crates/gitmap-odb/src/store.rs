//! In-memory object and reference stores.
//!
//! [`MemoryStore`] serves the textual object representations the query
//! interface is specified over, addressed by their content hash. It doubles
//! as the fixture backend for tests: repositories are assembled object by
//! object with the `put_*` constructors.

use crate::{
    Head, ObjectId, ObjectQuery, ObjectType, OdbError, Result, WorkTreeStatus,
};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A git reference (branch, tag, remote, or symbolic ref).
#[derive(Debug, Clone)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference (e.g., HEAD -> refs/heads/main).
    Symbolic(String),
}

impl Reference {
    /// Returns the object ID if this is a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }
}

/// Thread-safe reference store.
///
/// Refs are the one mutable piece of repository state: unlike objects they
/// are named, not content-addressed, and can be reassigned.
#[derive(Debug, Default)]
pub struct RefStore {
    refs: RwLock<HashMap<String, Reference>>,
}

impl RefStore {
    /// Creates a new empty reference store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a reference by name.
    pub fn get(&self, name: &str) -> Result<Reference> {
        self.refs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| OdbError::RefNotFound(name.to_string()))
    }

    /// Sets a reference to point to an object.
    pub fn set(&self, name: &str, target: ObjectId) {
        self.refs
            .write()
            .insert(name.to_string(), Reference::Direct(target));
    }

    /// Sets a symbolic reference.
    pub fn set_symbolic(&self, name: &str, target: &str) {
        self.refs
            .write()
            .insert(name.to_string(), Reference::Symbolic(target.to_string()));
    }

    /// Deletes a reference.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.refs
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| OdbError::RefNotFound(name.to_string()))
    }

    /// Lists all references, sorted by name for deterministic traversal.
    pub fn list_all(&self) -> Vec<(String, Reference)> {
        let mut refs: Vec<_> = self
            .refs
            .read()
            .iter()
            .map(|(name, refr)| (name.clone(), refr.clone()))
            .collect();
        refs.sort_by(|a, b| a.0.cmp(&b.0));
        refs
    }

    /// Resolves a reference chain to a direct object id.
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        match self.get(name)? {
            Reference::Direct(id) => Ok(id),
            Reference::Symbolic(target) => match self.get(&target)? {
                Reference::Direct(id) => Ok(id),
                Reference::Symbolic(_) => Err(OdbError::InvalidRef(
                    "deeply nested symbolic refs not supported".to_string(),
                )),
            },
        }
    }

    /// Resolves HEAD to the current commit.
    pub fn resolve_head(&self) -> Result<ObjectId> {
        self.resolve("HEAD")
    }

    /// Gets the current branch name (if HEAD is symbolic).
    pub fn current_branch(&self) -> Option<String> {
        match self.get("HEAD").ok()? {
            Reference::Symbolic(target) => {
                target.strip_prefix("refs/heads/").map(|s| s.to_string())
            }
            Reference::Direct(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    object_type: ObjectType,
    content: Bytes,
}

/// In-memory content-addressed object store with embedded refs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    refs: RefStore,
    status: RwLock<Option<WorkTreeStatus>>,
}

impl MemoryStore {
    /// Creates an empty store with HEAD on an unborn `main` branch.
    pub fn new() -> Self {
        let store = Self::default();
        store.refs.set_symbolic("HEAD", "refs/heads/main");
        store
    }

    /// Returns the reference store.
    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    /// Stores an object's textual representation and returns its id.
    pub fn put(&self, object_type: ObjectType, content: impl Into<Bytes>) -> ObjectId {
        let content = content.into();
        let id = ObjectId::hash_object(object_type, &content);
        self.objects.write().insert(
            id,
            StoredObject {
                object_type,
                content,
            },
        );
        id
    }

    /// Stores a blob.
    pub fn put_blob(&self, content: impl Into<Bytes>) -> ObjectId {
        self.put(ObjectType::Blob, content)
    }

    /// Stores a tree from `(kind, id, name)` entries.
    ///
    /// Entries are serialized in the `<mode> <type> <id>\t<name>` grammar
    /// the query interface serves.
    pub fn put_tree(&self, entries: &[(ObjectType, ObjectId, &str)]) -> ObjectId {
        let mut content = String::new();
        for (kind, id, name) in entries {
            let mode = match kind {
                ObjectType::Tree => "040000",
                _ => "100644",
            };
            content.push_str(&format!("{} {} {}\t{}\n", mode, kind.as_str(), id, name));
        }
        self.put(ObjectType::Tree, content.into_bytes())
    }

    /// Stores a commit.
    pub fn put_commit(
        &self,
        tree_id: &ObjectId,
        parents: &[ObjectId],
        author: &str,
        committer: &str,
        message: &str,
    ) -> ObjectId {
        let mut content = format!("tree {}\n", tree_id);
        for parent in parents {
            content.push_str(&format!("parent {}\n", parent));
        }
        content.push_str(&format!("author {}\n", author));
        content.push_str(&format!("committer {}\n", committer));
        content.push_str(&format!("\n{}", message));
        self.put(ObjectType::Commit, content.into_bytes())
    }

    /// Stores an annotated tag.
    pub fn put_tag(
        &self,
        target: &ObjectId,
        target_type: ObjectType,
        name: &str,
        tagger: &str,
        message: &str,
    ) -> ObjectId {
        let content = format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
            target,
            target_type.as_str(),
            name,
            tagger,
            message
        );
        self.put(ObjectType::Tag, content.into_bytes())
    }

    /// Checks if an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().contains_key(id)
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Sets the reported working-tree status.
    pub fn set_work_tree_status(&self, status: WorkTreeStatus) {
        *self.status.write() = Some(status);
    }
}

impl ObjectQuery for MemoryStore {
    fn list_object_ids(&self) -> Result<Vec<ObjectId>> {
        let mut ids: Vec<ObjectId> = self.objects.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn object_type(&self, id: &ObjectId) -> Result<ObjectType> {
        self.objects
            .read()
            .get(id)
            .map(|obj| obj.object_type)
            .ok_or_else(|| OdbError::UnresolvableObject(id.to_hex()))
    }

    fn object_content(&self, id: &ObjectId) -> Result<Bytes> {
        self.objects
            .read()
            .get(id)
            .map(|obj| obj.content.clone())
            .ok_or_else(|| OdbError::UnresolvableObject(id.to_hex()))
    }

    fn list_refs(&self) -> Result<Vec<(String, ObjectId)>> {
        let mut resolved = Vec::new();
        for (name, reference) in self.refs.list_all() {
            if name == "HEAD" {
                continue;
            }
            let target = match reference {
                Reference::Direct(id) => id,
                Reference::Symbolic(_) => self.refs.resolve(&name)?,
            };
            resolved.push((name, target));
        }
        Ok(resolved)
    }

    fn head(&self) -> Result<Head> {
        Ok(Head {
            target: self.refs.resolve_head()?,
            branch: self.refs.current_branch(),
        })
    }

    fn work_tree_status(&self) -> Result<Option<WorkTreeStatus>> {
        Ok(self.status.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkTreeEntry;

    fn seed_commit(store: &MemoryStore) -> ObjectId {
        let blob = store.put_blob(b"file content".as_ref());
        let tree = store.put_tree(&[(ObjectType::Blob, blob, "file.txt")]);
        let author = "Alice <alice@example.com> 1234567890 +0000";
        store.put_commit(&tree, &[], author, author, "Initial commit")
    }

    #[test]
    fn test_store_roundtrip() {
        let store = MemoryStore::new();
        let id = store.put_blob(b"Hello, World!".as_ref());

        assert!(store.contains(&id));
        assert_eq!(store.object_type(&id).unwrap(), ObjectType::Blob);
        assert_eq!(
            store.object_content(&id).unwrap().as_ref(),
            b"Hello, World!"
        );
    }

    #[test]
    fn test_unresolvable_object() {
        let store = MemoryStore::new();
        let id = ObjectId::from_bytes([7u8; 20]);

        let result = store.object_type(&id);
        assert!(matches!(result, Err(OdbError::UnresolvableObject(_))));
        let result = store.object_content(&id);
        assert!(matches!(result, Err(OdbError::UnresolvableObject(_))));
    }

    #[test]
    fn test_commit_content_grammar() {
        let store = MemoryStore::new();
        let tree = ObjectId::from_bytes([1u8; 20]);
        let parent = ObjectId::from_bytes([2u8; 20]);
        let author = "Alice <alice@example.com> 1234567890 +0000";

        let id = store.put_commit(&tree, &[parent], author, author, "A change");
        let content = store.object_content(&id).unwrap();
        let text = std::str::from_utf8(&content).unwrap();

        assert!(text.starts_with(&format!("tree {}\n", tree)));
        assert!(text.contains(&format!("parent {}\n", parent)));
        assert!(text.ends_with("\nA change"));
    }

    #[test]
    fn test_tree_content_grammar() {
        let store = MemoryStore::new();
        let blob = store.put_blob(b"x".as_ref());
        let sub = store.put_tree(&[(ObjectType::Blob, blob, "inner.txt")]);
        let tree = store.put_tree(&[
            (ObjectType::Blob, blob, "file.txt"),
            (ObjectType::Tree, sub, "dir"),
        ]);

        let content = store.object_content(&tree).unwrap();
        let text = std::str::from_utf8(&content).unwrap();
        assert!(text.contains(&format!("100644 blob {}\tfile.txt\n", blob)));
        assert!(text.contains(&format!("040000 tree {}\tdir\n", sub)));
    }

    #[test]
    fn test_tag_content_grammar() {
        let store = MemoryStore::new();
        let commit = seed_commit(&store);
        let tag = store.put_tag(&commit, ObjectType::Commit, "v1.0", "Bob <b@e> 1 +0000", "release");

        let content = store.object_content(&tag).unwrap();
        let text = std::str::from_utf8(&content).unwrap();
        assert!(text.starts_with(&format!("object {}\ntype commit\n", commit)));
    }

    #[test]
    fn test_list_refs_resolves_and_excludes_head() {
        let store = MemoryStore::new();
        let commit = seed_commit(&store);

        store.refs().set("refs/heads/main", commit);
        store.refs().set("refs/tags/v1", commit);
        store.refs().set_symbolic("refs/heads/alias", "refs/heads/main");

        let refs = store.list_refs().unwrap();
        let names: Vec<&str> = refs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["refs/heads/alias", "refs/heads/main", "refs/tags/v1"]
        );
        assert!(refs.iter().all(|(_, id)| *id == commit));
    }

    #[test]
    fn test_head_on_branch() {
        let store = MemoryStore::new();
        let commit = seed_commit(&store);
        store.refs().set("refs/heads/main", commit);

        let head = store.head().unwrap();
        assert_eq!(head.target, commit);
        assert_eq!(head.branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_head_detached() {
        let store = MemoryStore::new();
        let commit = seed_commit(&store);
        store.refs().set("HEAD", commit);

        let head = store.head().unwrap();
        assert_eq!(head.target, commit);
        assert_eq!(head.branch, None);
    }

    #[test]
    fn test_head_unborn_branch() {
        let store = MemoryStore::new();
        assert!(matches!(store.head(), Err(OdbError::RefNotFound(_))));
    }

    #[test]
    fn test_ref_reassignment() {
        let store = MemoryStore::new();
        let a = ObjectId::from_bytes([1u8; 20]);
        let b = ObjectId::from_bytes([2u8; 20]);

        store.refs().set("refs/heads/main", a);
        store.refs().set("refs/heads/main", b);
        assert_eq!(
            store.refs().get("refs/heads/main").unwrap().as_direct(),
            Some(b)
        );
    }

    #[test]
    fn test_ref_delete() {
        let store = MemoryStore::new();
        store.refs().set("refs/heads/gone", ObjectId::from_bytes([1u8; 20]));
        store.refs().delete("refs/heads/gone").unwrap();
        assert!(store.refs().get("refs/heads/gone").is_err());
        assert!(store.refs().delete("refs/heads/gone").is_err());
    }

    #[test]
    fn test_deeply_nested_symbolic_ref() {
        let store = MemoryStore::new();
        store.refs().set_symbolic("refs/a", "refs/b");
        store.refs().set_symbolic("refs/b", "refs/c");
        assert!(matches!(
            store.refs().resolve("refs/a"),
            Err(OdbError::InvalidRef(_))
        ));
    }

    #[test]
    fn test_work_tree_status() {
        let store = MemoryStore::new();
        assert_eq!(store.work_tree_status().unwrap(), None);

        let status = WorkTreeStatus {
            modified: vec![WorkTreeEntry {
                path: "file.txt".to_string(),
                blob_id: ObjectId::from_bytes([3u8; 20]),
            }],
            staged: vec![],
            untracked: vec!["new.txt".to_string()],
        };
        store.set_work_tree_status(status.clone());
        assert_eq!(store.work_tree_status().unwrap(), Some(status));
    }

    #[test]
    fn test_list_object_ids_sorted() {
        let store = MemoryStore::new();
        let a = store.put_blob(b"a".as_ref());
        let b = store.put_blob(b"b".as_ref());
        let c = store.put_blob(b"c".as_ref());

        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(store.list_object_ids().unwrap(), expected);
    }

    #[test]
    fn test_identical_content_deduplicates() {
        let store = MemoryStore::new();
        let a = store.put_blob(b"same".as_ref());
        let b = store.put_blob(b"same".as_ref());
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }
}
