//! Typed object model.
//!
//! A closed set of object variants, each parsing its relations from the
//! store's textual representation exactly once on first access. Edges are
//! expressed in one direction only: a [`Link`] always points at the object
//! structurally referenced by its owner (commit to its parents and tree,
//! tree to its entries, tag to its target). The ancestry-reverse relation
//! lives solely in the graph builder's adjacency map.

use crate::{GraphError, Result};
use bytes::Bytes;
use gitmap_odb::{ObjectId, ObjectQuery, ObjectType, Resolver};
use once_cell::sync::OnceCell;
use std::collections::HashMap;

/// An edge descriptor: the pointed-to object plus the role or path-segment
/// label the owner gives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target object id.
    pub target: ObjectId,
    /// Edge label: `parent`, `tree`, `object`, or a tree-entry name.
    pub label: String,
}

impl Link {
    fn new(target: ObjectId, label: impl Into<String>) -> Self {
        Self {
            target,
            label: label.into(),
        }
    }
}

/// Parsed commit relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRelations {
    /// The single tree the commit snapshots.
    pub tree: ObjectId,
    /// Parent commits, order preserved; index 0 is the primary parent.
    pub parents: Vec<ObjectId>,
}

/// A commit object with lazily parsed relations.
#[derive(Debug)]
pub struct Commit {
    id: ObjectId,
    relations: OnceCell<CommitRelations>,
}

impl Commit {
    /// Returns this commit's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the parsed relations, fetching and parsing content on first
    /// access.
    pub fn relations<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<&CommitRelations> {
        self.relations.get_or_try_init(|| {
            let content = resolver.resolve_content(&self.id)?;
            parse_commit(&self.id, &content)
        })
    }

    /// Returns the parent commit ids, primary parent first.
    pub fn parents<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<&[ObjectId]> {
        Ok(&self.relations(resolver)?.parents)
    }

    /// Returns the id of the tree this commit snapshots.
    pub fn tree<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<ObjectId> {
        Ok(self.relations(resolver)?.tree)
    }
}

/// A single tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode string, e.g. `100644`.
    pub mode: String,
    /// Entry kind: blob or nested tree.
    pub kind: ObjectType,
    /// Entry object id.
    pub id: ObjectId,
    /// Path-name segment.
    pub name: String,
}

/// A tree object with lazily parsed entries.
#[derive(Debug)]
pub struct Tree {
    id: ObjectId,
    entries: OnceCell<Vec<TreeEntry>>,
}

impl Tree {
    /// Returns this tree's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the tree's entries in content order.
    pub fn entries<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<&[TreeEntry]> {
        let entries = self.entries.get_or_try_init(|| {
            let content = resolver.resolve_content(&self.id)?;
            parse_tree(&self.id, &content)
        })?;
        Ok(entries)
    }
}

/// A blob object. Content-only leaf; no relations to parse.
#[derive(Debug)]
pub struct Blob {
    id: ObjectId,
}

impl Blob {
    /// Returns this blob's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// The object an annotated tag points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTarget {
    /// Target object id.
    pub id: ObjectId,
    /// Target kind as declared by the tag.
    pub kind: ObjectType,
}

/// An annotated tag with a lazily parsed target.
#[derive(Debug)]
pub struct AnnotatedTag {
    id: ObjectId,
    target: OnceCell<TagTarget>,
}

impl AnnotatedTag {
    /// Returns this tag's id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the tagged object.
    pub fn target<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<&TagTarget> {
        self.target.get_or_try_init(|| {
            let content = resolver.resolve_content(&self.id)?;
            parse_tag(&self.id, &content)
        })
    }
}

/// A resolved repository object.
#[derive(Debug)]
pub enum GitObject {
    /// Commit object.
    Commit(Commit),
    /// Tree object.
    Tree(Tree),
    /// Blob object.
    Blob(Blob),
    /// Annotated tag object.
    Tag(AnnotatedTag),
}

impl GitObject {
    /// Determines the object's kind through the resolver and instantiates
    /// the matching variant. Relations stay unparsed until first access.
    pub fn create<Q: ObjectQuery>(id: ObjectId, resolver: &Resolver<Q>) -> Result<Self> {
        let object = match resolver.resolve_type(&id)? {
            ObjectType::Commit => Self::Commit(Commit {
                id,
                relations: OnceCell::new(),
            }),
            ObjectType::Tree => Self::Tree(Tree {
                id,
                entries: OnceCell::new(),
            }),
            ObjectType::Blob => Self::Blob(Blob { id }),
            ObjectType::Tag => Self::Tag(AnnotatedTag {
                id,
                target: OnceCell::new(),
            }),
        };
        Ok(object)
    }

    /// Returns the object's id.
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Commit(c) => c.id,
            Self::Tree(t) => t.id,
            Self::Blob(b) => b.id,
            Self::Tag(t) => t.id,
        }
    }

    /// Returns the object's kind.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Commit(_) => ObjectType::Commit,
            Self::Tree(_) => ObjectType::Tree,
            Self::Blob(_) => ObjectType::Blob,
            Self::Tag(_) => ObjectType::Tag,
        }
    }

    /// Enumerates the object's outgoing structural edges.
    pub fn links<Q: ObjectQuery>(&self, resolver: &Resolver<Q>) -> Result<Vec<Link>> {
        match self {
            Self::Commit(c) => {
                let relations = c.relations(resolver)?;
                let mut links: Vec<Link> = relations
                    .parents
                    .iter()
                    .map(|p| Link::new(*p, "parent"))
                    .collect();
                links.push(Link::new(relations.tree, "tree"));
                Ok(links)
            }
            Self::Tree(t) => Ok(t
                .entries(resolver)?
                .iter()
                .map(|e| Link::new(e.id, e.name.clone()))
                .collect()),
            Self::Blob(_) => Ok(Vec::new()),
            Self::Tag(t) => {
                let target = t.target(resolver)?;
                Ok(vec![Link::new(target.id, "object")])
            }
        }
    }
}

fn content_text<'a>(id: &ObjectId, content: &'a Bytes) -> Result<&'a str> {
    std::str::from_utf8(content).map_err(|_| GraphError::malformed(id, "content is not UTF-8"))
}

fn parse_id(id: &ObjectId, hex: &str, what: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex.trim())
        .map_err(|_| GraphError::malformed(id, format!("invalid {} id: {:?}", what, hex)))
}

fn parse_commit(id: &ObjectId, content: &Bytes) -> Result<CommitRelations> {
    let text = content_text(id, content)?;
    let mut tree = None;
    let mut parents = Vec::new();

    // Headers end at the first blank line; the message may contain anything.
    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix("tree ") {
            if tree.is_none() {
                tree = Some(parse_id(id, rest, "tree")?);
            }
        } else if let Some(rest) = line.strip_prefix("parent ") {
            parents.push(parse_id(id, rest, "parent")?);
        }
    }

    let tree = tree.ok_or_else(|| GraphError::MissingTree(id.to_hex()))?;
    Ok(CommitRelations { tree, parents })
}

fn parse_tree(id: &ObjectId, content: &Bytes) -> Result<Vec<TreeEntry>> {
    let text = content_text(id, content)?;
    let mut entries = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let (meta, name) = line
            .split_once('\t')
            .ok_or_else(|| GraphError::malformed(id, format!("tree entry without tab: {:?}", line)))?;
        let mut fields = meta.split(' ');
        let (mode, kind, entry_id) = match (fields.next(), fields.next(), fields.next()) {
            (Some(mode), Some(kind), Some(entry_id)) => (mode, kind, entry_id),
            _ => {
                return Err(GraphError::malformed(
                    id,
                    format!("tree entry with short header: {:?}", line),
                ))
            }
        };
        let kind = match kind {
            "blob" => ObjectType::Blob,
            "tree" => ObjectType::Tree,
            other => {
                return Err(GraphError::malformed(
                    id,
                    format!("unsupported tree entry type: {:?}", other),
                ))
            }
        };
        entries.push(TreeEntry {
            mode: mode.to_string(),
            kind,
            id: parse_id(id, entry_id, "tree entry")?,
            name: name.to_string(),
        });
    }

    Ok(entries)
}

fn parse_tag(id: &ObjectId, content: &Bytes) -> Result<TagTarget> {
    let text = content_text(id, content)?;
    let mut target = None;
    let mut kind = None;

    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix("object ") {
            target = Some(parse_id(id, rest, "tag target")?);
        } else if let Some(rest) = line.strip_prefix("type ") {
            kind = Some(
                ObjectType::parse(rest.trim())
                    .map_err(|_| GraphError::malformed(id, format!("bad tag type: {:?}", rest)))?,
            );
        }
    }

    match (target, kind) {
        (Some(id), Some(kind)) => Ok(TagTarget { id, kind }),
        (None, _) => Err(GraphError::malformed(id, "tag without object line")),
        (_, None) => Err(GraphError::malformed(id, "tag without type line")),
    }
}

/// Id-keyed arena of resolved objects.
///
/// Every id resolves to exactly one [`GitObject`] instance for the lifetime
/// of a graph-build pass, so equal ids always share parsed relations.
#[derive(Debug, Default)]
pub struct ObjectArena {
    objects: HashMap<ObjectId, GitObject>,
}

impl ObjectArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the already-resolved object for an id, if any.
    pub fn get(&self, id: &ObjectId) -> Option<&GitObject> {
        self.objects.get(id)
    }

    /// Returns the object for an id, resolving its type on first reference.
    pub fn get_or_create<Q: ObjectQuery>(
        &mut self,
        id: ObjectId,
        resolver: &Resolver<Q>,
    ) -> Result<&GitObject> {
        if !self.objects.contains_key(&id) {
            let object = GitObject::create(id, resolver)?;
            self.objects.insert(id, object);
        }
        Ok(&self.objects[&id])
    }

    /// Returns the commit for an id, or `UnexpectedType` if it is not one.
    pub fn commit<Q: ObjectQuery>(
        &mut self,
        id: ObjectId,
        resolver: &Resolver<Q>,
    ) -> Result<&Commit> {
        match self.get_or_create(id, resolver)? {
            GitObject::Commit(commit) => Ok(commit),
            other => Err(GraphError::UnexpectedType {
                id: id.to_hex(),
                expected: "commit",
                actual: other.object_type().as_str(),
            }),
        }
    }

    /// Returns the tree for an id, or `UnexpectedType` if it is not one.
    pub fn tree<Q: ObjectQuery>(
        &mut self,
        id: ObjectId,
        resolver: &Resolver<Q>,
    ) -> Result<&Tree> {
        match self.get_or_create(id, resolver)? {
            GitObject::Tree(tree) => Ok(tree),
            other => Err(GraphError::UnexpectedType {
                id: id.to_hex(),
                expected: "tree",
                actual: other.object_type().as_str(),
            }),
        }
    }

    /// Returns the number of resolved objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no object has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
