//! Renderer-facing display set.
//!
//! The graph engine's output: a deterministic node and edge list plus the
//! computed short-id display length. Drawing (layout, colors, file output)
//! is a consumer concern; these types only carry the structure.

use gitmap_odb::ObjectId;
use serde::{Deserialize, Serialize};

/// Classification of a ref for display labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// The symbolic HEAD pseudo-ref.
    Head,
    /// A local branch under `refs/heads/`.
    Branch,
    /// A tag under `refs/tags/`.
    Tag,
    /// A remote-tracking ref under `refs/remotes/`.
    Remote,
}

impl RefKind {
    /// Classifies a ref by its full name.
    pub fn classify(name: &str) -> Self {
        if name == "HEAD" {
            Self::Head
        } else if name.starts_with("refs/tags/") {
            Self::Tag
        } else if name.starts_with("refs/remotes/") {
            Self::Remote
        } else {
            Self::Branch
        }
    }

    /// Returns the edge label used for this ref kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Remote => "remote",
        }
    }
}

/// A node in the display set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayNode {
    /// A named ref.
    Ref {
        /// Full ref name.
        name: String,
        /// Ref classification.
        ref_kind: RefKind,
    },
    /// A retained commit.
    Commit {
        /// Commit id.
        id: ObjectId,
    },
    /// A collapsed run of boring commits.
    Summary {
        /// Most-recent commit of the run, nearer the tip. Doubles as the
        /// node key so edges into the run connect without rewriting.
        first: ObjectId,
        /// Oldest commit of the run, nearer the root.
        last: ObjectId,
        /// Number of commits collapsed into this node.
        count: usize,
    },
    /// A commit past the traversal depth limit, shown as a placeholder.
    Elided {
        /// Commit id.
        id: ObjectId,
    },
    /// An annotated tag object.
    Tag {
        /// Tag object id.
        id: ObjectId,
    },
    /// A tree object.
    Tree {
        /// Tree id.
        id: ObjectId,
    },
    /// A blob object.
    Blob {
        /// Blob id.
        id: ObjectId,
    },
    /// The uncommitted working-tree state.
    WorkTree {
        /// Paths not tracked at all; they identify no stored object, so
        /// they ride on the node itself rather than on edges.
        untracked: Vec<String>,
    },
}

impl DisplayNode {
    /// Returns the node's unique key: the ref name for refs, the hex id for
    /// objects (a summary is keyed by its tip-near commit).
    pub fn key(&self) -> String {
        match self {
            Self::Ref { name, .. } => name.clone(),
            Self::Commit { id }
            | Self::Elided { id }
            | Self::Tag { id }
            | Self::Tree { id }
            | Self::Blob { id } => id.to_hex(),
            Self::Summary { first, .. } => first.to_hex(),
            Self::WorkTree { .. } => "WORKTREE".to_string(),
        }
    }

    /// Returns a human-readable label, truncating ids to `short_len`.
    pub fn label(&self, short_len: usize) -> String {
        match self {
            Self::Ref { name, .. } => name.clone(),
            Self::Commit { id } | Self::Tag { id } | Self::Tree { id } | Self::Blob { id } => {
                id.short(short_len)
            }
            Self::Summary { first, last, count } => {
                format!("{} ({}) {}", last.short(short_len), count, first.short(short_len))
            }
            Self::Elided { .. } => "...".to_string(),
            Self::WorkTree { untracked } => {
                let mut label = String::from("working tree");
                for path in untracked {
                    label.push_str("\nuntracked: ");
                    label.push_str(path);
                }
                label
            }
        }
    }
}

/// A labelled edge between two display nodes, by node key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEdge {
    /// Source node key.
    pub from: String,
    /// Target node key.
    pub to: String,
    /// Edge label.
    pub label: String,
}

/// The final display set handed to a renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayGraph {
    /// Nodes in deterministic traversal order.
    pub nodes: Vec<DisplayNode>,
    /// Edges in deterministic traversal order, deduplicated by endpoints.
    pub edges: Vec<DisplayEdge>,
    /// Short-identifier display length derived from the commit count.
    pub short_id_len: usize,
}

impl DisplayGraph {
    /// Finds a node by key.
    pub fn node(&self, key: &str) -> Option<&DisplayNode> {
        self.nodes.iter().find(|n| n.key() == key)
    }

    /// Returns true if an edge with the given endpoints exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    /// Returns all retained commit ids (excluding summaries and elisions).
    pub fn commit_ids(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                DisplayNode::Commit { id } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Returns all summary nodes.
    pub fn summaries(&self) -> Vec<&DisplayNode> {
        self.nodes
            .iter()
            .filter(|n| matches!(n, DisplayNode::Summary { .. }))
            .collect()
    }
}
