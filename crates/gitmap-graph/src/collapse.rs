//! The collapsing engine and display-set assembly.
//!
//! Second pass: each seed's spine is walked again, now with the full
//! reverse adjacency available, and maximal runs of boring commits are
//! replaced by summary nodes. A commit is boring when it has exactly one
//! parent, exactly one child (fan-in one), and no selected ref resolves to
//! it; everything else is a boundary and survives verbatim.

use crate::builder::{Discovery, GraphOptions, Seed, SeedOrigin};
use crate::display::{DisplayEdge, DisplayGraph, DisplayNode, RefKind};
use crate::object::{GitObject, ObjectArena};
use crate::Result;
use gitmap_odb::{ObjectId, ObjectQuery, ObjectType, Resolver};
use std::collections::HashSet;
use tracing::{debug, info};

/// State of one in-progress run of boring commits.
struct Run {
    /// Most-recent commit of the run, nearer the tip.
    first: ObjectId,
    /// Oldest commit seen so far.
    last: ObjectId,
    /// Commits accumulated.
    count: usize,
}

struct Assembler<'a, Q> {
    resolver: &'a Resolver<Q>,
    arena: &'a mut ObjectArena,
    discovery: &'a Discovery,
    options: &'a GraphOptions,
    /// Commits a selected ref resolves to; never boring.
    pinned: HashSet<ObjectId>,
    /// Commits already handled by an earlier seed's walk.
    processed: HashSet<ObjectId>,
    nodes: Vec<DisplayNode>,
    node_keys: HashSet<String>,
    edges: Vec<DisplayEdge>,
    edge_keys: HashSet<(String, String)>,
}

/// Runs the collapsing pass over a finished pre-scan and assembles the
/// display set. Pure in its inputs: the same discovery and options always
/// produce the same graph.
pub(crate) fn assemble<Q: ObjectQuery>(
    resolver: &Resolver<Q>,
    arena: &mut ObjectArena,
    discovery: &Discovery,
    options: &GraphOptions,
) -> Result<DisplayGraph> {
    let pinned = discovery
        .seeds
        .iter()
        .filter(|s| matches!(s.origin, SeedOrigin::Ref { .. }))
        .filter_map(|s| s.tip)
        .collect();

    let mut assembler = Assembler {
        resolver,
        arena,
        discovery,
        options,
        pinned,
        processed: HashSet::new(),
        nodes: Vec::new(),
        node_keys: HashSet::new(),
        edges: Vec::new(),
        edge_keys: HashSet::new(),
    };

    info!(seeds = discovery.seeds.len(), "assembling display graph");
    for seed in &discovery.seeds {
        assembler.add_seed(seed)?;
    }
    assembler.add_symbolic_head()?;
    if options.include_trees_blobs {
        assembler.expand_trees()?;
    }
    if options.include_work_tree {
        assembler.add_work_tree()?;
    }

    info!(
        nodes = assembler.nodes.len(),
        edges = assembler.edges.len(),
        "display graph assembled"
    );
    Ok(DisplayGraph {
        nodes: assembler.nodes,
        edges: assembler.edges,
        short_id_len: discovery.short_id_len,
    })
}

impl<Q: ObjectQuery> Assembler<'_, Q> {
    fn add_node(&mut self, node: DisplayNode) {
        let key = node.key();
        if self.node_keys.insert(key.clone()) {
            self.nodes.push(node);
            return;
        }
        // A depth placeholder left by one walk is upgraded when a later
        // walk reaches the commit within its own budget.
        if matches!(node, DisplayNode::Elided { .. }) {
            return;
        }
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.key() == key) {
            if matches!(existing, DisplayNode::Elided { .. }) {
                *existing = node;
            }
        }
    }

    fn add_edge(&mut self, from: String, to: String, label: &str) {
        if self.edge_keys.insert((from.clone(), to.clone())) {
            self.edges.push(DisplayEdge {
                from,
                to,
                label: label.to_string(),
            });
        }
    }

    fn boring(&self, id: &ObjectId, parent_count: usize) -> bool {
        parent_count == 1 && self.discovery.fan_in(id) == 1 && !self.pinned.contains(id)
    }

    /// Adds the ref/tag entry nodes for a seed, then walks its spine.
    fn add_seed(&mut self, seed: &Seed) -> Result<()> {
        if let SeedOrigin::Ref { name, kind } = &seed.origin {
            debug!(ref_name = %name, "processing ref");
            self.add_node(DisplayNode::Ref {
                name: name.clone(),
                ref_kind: *kind,
            });
            let first_hop = seed.tag.unwrap_or(seed.target);
            self.add_edge(name.clone(), first_hop.to_hex(), kind.label());
            if let Some(tag_id) = seed.tag {
                self.add_node(DisplayNode::Tag { id: tag_id });
                self.add_edge(tag_id.to_hex(), seed.target.to_hex(), "object");
            }
            if seed.tip.is_none() {
                // Tag of a tree or blob: show the target, nothing to walk.
                let kind = self.arena.get(&seed.target).map(GitObject::object_type);
                match kind {
                    Some(ObjectType::Tree) => {
                        self.add_node(DisplayNode::Tree { id: seed.target })
                    }
                    Some(ObjectType::Blob) => {
                        self.add_node(DisplayNode::Blob { id: seed.target })
                    }
                    _ => {}
                }
            }
        }

        let Some(tip) = seed.tip else {
            return Ok(());
        };
        self.walk_spine(tip)
    }

    /// Walks one spine from its tip, collapsing runs of boring commits.
    fn walk_spine(&mut self, tip: ObjectId) -> Result<()> {
        let mut current = Some(tip);
        let mut run: Option<Run> = None;
        let mut depth = 0usize;

        while let Some(commit_id) = current {
            // A commit handled by an earlier seed's walk terminates this
            // one; an open run closes against it as the boundary.
            if self.processed.contains(&commit_id) {
                if let Some(run) = run.take() {
                    self.close_run(run, &commit_id);
                }
                break;
            }

            depth += 1;
            if self.options.max_depth.is_some_and(|max| depth > max) {
                if let Some(run) = run.take() {
                    self.close_run(run, &commit_id);
                }
                // Not marked processed: each walk has its own depth budget,
                // so a later seed may still reach this commit and show it.
                self.add_node(DisplayNode::Elided { id: commit_id });
                break;
            }

            self.processed.insert(commit_id);
            let parents = self
                .arena
                .commit(commit_id, self.resolver)?
                .parents(self.resolver)?
                .to_vec();

            if self.options.collapse && self.boring(&commit_id, parents.len()) {
                match run.as_mut() {
                    Some(run) => {
                        run.last = commit_id;
                        run.count += 1;
                    }
                    None => {
                        run = Some(Run {
                            first: commit_id,
                            last: commit_id,
                            count: 1,
                        });
                    }
                }
            } else {
                if let Some(run) = run.take() {
                    self.close_run(run, &commit_id);
                }
                self.add_commit(commit_id, &parents);
            }

            current = parents.first().copied();
        }

        // A spine can only end mid-run at a root, and roots are boundaries,
        // so an open run here would be a bookkeeping bug.
        debug_assert!(run.is_none());
        Ok(())
    }

    /// Retains a boundary commit with edges to all of its parents.
    fn add_commit(&mut self, id: ObjectId, parents: &[ObjectId]) {
        self.add_node(DisplayNode::Commit { id });
        for parent in parents {
            self.add_edge(id.to_hex(), parent.to_hex(), "parent");
        }
    }

    /// Closes a run against the boundary commit that follows it.
    ///
    /// A run of one collapses to nothing: the commit is un-deleted and
    /// connected directly. Longer runs become one summary node, keyed by
    /// the run's tip-near commit so edges into the run connect unchanged.
    fn close_run(&mut self, run: Run, boundary: &ObjectId) {
        if run.count == 1 {
            self.add_node(DisplayNode::Commit { id: run.first });
        } else {
            debug!(
                first = %run.first,
                last = %run.last,
                count = run.count,
                "collapsed boring run"
            );
            self.add_node(DisplayNode::Summary {
                first: run.first,
                last: run.last,
                count: run.count,
            });
        }
        self.add_edge(run.first.to_hex(), boundary.to_hex(), "parent");
    }

    /// Adds the symbolic HEAD node and its edge to the current branch ref.
    fn add_symbolic_head(&mut self) -> Result<()> {
        let Ok(head) = self.resolver.query().head() else {
            // Unborn branch: nothing to point at.
            return Ok(());
        };
        let Some(branch) = head.branch else {
            return Ok(());
        };
        let ref_name = format!("refs/heads/{}", branch);
        self.add_node(DisplayNode::Ref {
            name: "HEAD".to_string(),
            ref_kind: RefKind::Head,
        });
        self.add_edge("HEAD".to_string(), ref_name, RefKind::Head.label());
        Ok(())
    }

    /// Expands each retained commit's tree closure into the display set.
    fn expand_trees(&mut self) -> Result<()> {
        let commits: Vec<ObjectId> = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                DisplayNode::Commit { id } | DisplayNode::Elided { id } => Some(*id),
                _ => None,
            })
            .collect();
        for commit_id in commits {
            let tree_id = self
                .arena
                .commit(commit_id, self.resolver)?
                .tree(self.resolver)?;
            self.add_tree_closure(commit_id.to_hex(), "tree", tree_id)?;
        }
        Ok(())
    }

    fn add_tree_closure(&mut self, from: String, label: &str, tree_id: ObjectId) -> Result<()> {
        self.add_node(DisplayNode::Tree { id: tree_id });
        self.add_edge(from, tree_id.to_hex(), label);
        let entries = self
            .arena
            .tree(tree_id, self.resolver)?
            .entries(self.resolver)?
            .to_vec();
        for entry in entries {
            match entry.kind {
                ObjectType::Tree => {
                    self.add_tree_closure(tree_id.to_hex(), &entry.name, entry.id)?;
                }
                _ => {
                    self.add_node(DisplayNode::Blob { id: entry.id });
                    self.add_edge(tree_id.to_hex(), entry.id.to_hex(), &entry.name);
                }
            }
        }
        Ok(())
    }

    /// Adds the working-tree node, with edges to every status entry whose
    /// content hash identifies an object actually present in the store.
    /// Untracked paths have no object to point at and ride on the node.
    fn add_work_tree(&mut self) -> Result<()> {
        let Some(status) = self.resolver.query().work_tree_status()? else {
            return Ok(());
        };
        let node = DisplayNode::WorkTree {
            untracked: status.untracked.clone(),
        };
        let key = node.key();
        self.add_node(node);
        for (state, entries) in [("staged", &status.staged), ("modified", &status.modified)] {
            for entry in entries {
                if self.resolver.resolve_type(&entry.blob_id).is_err() {
                    // Content matches nothing tracked; no edge to draw.
                    continue;
                }
                self.add_node(DisplayNode::Blob { id: entry.blob_id });
                let label = format!("{}: {}", state, entry.path);
                self.add_edge(key.clone(), entry.blob_id.to_hex(), &label);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_graph, RefSelection};
    use gitmap_odb::{MemoryStore, ObjectType};

    const AUTHOR: &str = "Alice <alice@example.com> 1234567890 +0000";

    fn fixture() -> (MemoryStore, ObjectId) {
        let store = MemoryStore::new();
        let blob = store.put_blob(b"x".as_ref());
        let tree = store.put_tree(&[(ObjectType::Blob, blob, "file.txt")]);
        (store, tree)
    }

    fn chain(store: &MemoryStore, tree: &ObjectId, len: usize) -> Vec<ObjectId> {
        let mut commits = Vec::new();
        let mut parent: Option<ObjectId> = None;
        for i in 0..len {
            let parents: Vec<ObjectId> = parent.into_iter().collect();
            let id = store.put_commit(tree, &parents, AUTHOR, AUTHOR, &format!("commit {}", i));
            parent = Some(id);
            commits.push(id);
        }
        commits
    }

    fn collapse_options() -> GraphOptions {
        GraphOptions {
            refs: RefSelection::All,
            collapse: true,
            ..GraphOptions::default()
        }
    }

    #[test]
    fn test_boring_run_collapses_to_one_summary() {
        let (store, tree) = fixture();
        // root, three boring commits, ref-pinned tip.
        let commits = chain(&store, &tree, 5);
        store.refs().set("refs/heads/main", commits[4]);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        let summaries = graph.summaries();
        assert_eq!(summaries.len(), 1);
        let DisplayNode::Summary { first, last, count } = summaries[0] else {
            unreachable!();
        };
        assert_eq!(*first, commits[3]);
        assert_eq!(*last, commits[1]);
        assert_eq!(*count, 3);

        // Tip and root survive as boundaries, bridged through the summary.
        let retained = graph.commit_ids();
        assert_eq!(retained, vec![commits[4], commits[0]]);
        assert!(graph.has_edge(&commits[4].to_hex(), &commits[3].to_hex()));
        assert!(graph.has_edge(&commits[3].to_hex(), &commits[0].to_hex()));
    }

    #[test]
    fn test_run_of_one_collapses_to_nothing() {
        let (store, tree) = fixture();
        // root, one boring commit, tip: no summary node is emitted.
        let commits = chain(&store, &tree, 3);
        store.refs().set("refs/heads/main", commits[2]);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        assert!(graph.summaries().is_empty());
        assert_eq!(graph.commit_ids(), vec![commits[2], commits[1], commits[0]]);
        assert!(graph.has_edge(&commits[1].to_hex(), &commits[0].to_hex()));
    }

    #[test]
    fn test_root_is_never_boring() {
        let (store, tree) = fixture();
        let root = chain(&store, &tree, 1)[0];
        store.refs().set("refs/heads/main", root);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        assert_eq!(graph.commit_ids(), vec![root]);
        assert!(graph.summaries().is_empty());
    }

    #[test]
    fn test_ref_pinned_commit_is_never_boring() {
        let (store, tree) = fixture();
        // A mid-chain commit is pinned by a second ref; both halves of the
        // chain are too short to summarize around it.
        let commits = chain(&store, &tree, 5);
        store.refs().set("refs/heads/main", commits[4]);
        store.refs().set("refs/heads/pin", commits[2]);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        let retained = graph.commit_ids();
        assert!(retained.contains(&commits[2]));
        assert!(graph.summaries().is_empty());
        assert!(graph.has_edge("refs/heads/pin", &commits[2].to_hex()));
    }

    #[test]
    fn test_shared_ancestor_is_boundary() {
        let (store, tree) = fixture();
        let base = chain(&store, &tree, 2);
        let left = store.put_commit(&tree, &[base[1]], AUTHOR, AUTHOR, "left");
        let right = store.put_commit(&tree, &[base[1]], AUTHOR, AUTHOR, "right");
        store.refs().set("refs/heads/left", left);
        store.refs().set("refs/heads/right", right);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        // base[1] has fan-in 2, so it survives despite one parent.
        assert!(graph.commit_ids().contains(&base[1]));
    }

    #[test]
    fn test_merge_boundary_keeps_secondary_edge() {
        let (store, tree) = fixture();
        let main = chain(&store, &tree, 2);
        let feature = store.put_commit(&tree, &[main[0]], AUTHOR, AUTHOR, "feature");
        let merge = store.put_commit(&tree, &[main[1], feature], AUTHOR, AUTHOR, "merge");
        store.refs().set("refs/heads/main", merge);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        assert!(graph.has_edge(&merge.to_hex(), &main[1].to_hex()));
        assert!(graph.has_edge(&merge.to_hex(), &feature.to_hex()));
        assert!(graph.commit_ids().contains(&feature));
    }

    #[test]
    fn test_depth_limit_emits_elided_node() {
        let (store, tree) = fixture();
        let commits = chain(&store, &tree, 5);
        store.refs().set("refs/heads/main", commits[4]);
        let resolver = Resolver::new(store);

        let options = GraphOptions {
            max_depth: Some(2),
            ..GraphOptions::default()
        };
        let graph = build_graph(&resolver, &options).unwrap();

        assert_eq!(graph.commit_ids(), vec![commits[4], commits[3]]);
        assert!(graph
            .nodes
            .iter()
            .any(|n| matches!(n, DisplayNode::Elided { id } if *id == commits[2])));
        // The last shown commit still points at the elided one.
        assert!(graph.has_edge(&commits[3].to_hex(), &commits[2].to_hex()));
    }

    #[test]
    fn test_depth_limit_closes_open_run() {
        let (store, tree) = fixture();
        let commits = chain(&store, &tree, 6);
        store.refs().set("refs/heads/main", commits[5]);
        let resolver = Resolver::new(store);

        let options = GraphOptions {
            collapse: true,
            max_depth: Some(4),
            ..GraphOptions::default()
        };
        let graph = build_graph(&resolver, &options).unwrap();

        // Commits 4..2 are boring and accumulate; the cutoff at depth 5
        // closes the run against the elided commit.
        let summaries = graph.summaries();
        assert_eq!(summaries.len(), 1);
        let DisplayNode::Summary { first, last, count } = summaries[0] else {
            unreachable!();
        };
        assert_eq!(*first, commits[4]);
        assert_eq!(*last, commits[2]);
        assert_eq!(*count, 3);
        assert!(graph
            .nodes
            .iter()
            .any(|n| matches!(n, DisplayNode::Elided { id } if *id == commits[1])));
        assert!(graph.has_edge(&commits[4].to_hex(), &commits[1].to_hex()));
    }

    #[test]
    fn test_ref_pinned_past_another_refs_depth_cutoff() {
        let (store, tree) = fixture();
        // a-main's walk hits the depth limit at commits[3]; b-pin points
        // straight at that commit and must still show it and its ancestry,
        // independent of seed order.
        let commits = chain(&store, &tree, 6);
        store.refs().set("refs/heads/a-main", commits[5]);
        store.refs().set("refs/heads/b-pin", commits[3]);
        let resolver = Resolver::new(store);

        let options = GraphOptions {
            max_depth: Some(2),
            ..GraphOptions::default()
        };
        let graph = build_graph(&resolver, &options).unwrap();

        // The placeholder left by a-main's cutoff is upgraded to a commit.
        let retained = graph.commit_ids();
        assert!(retained.contains(&commits[3]));
        assert!(retained.contains(&commits[2]));
        assert!(!graph
            .nodes
            .iter()
            .any(|n| matches!(n, DisplayNode::Elided { id } if *id == commits[3])));
        assert!(graph.has_edge("refs/heads/b-pin", &commits[3].to_hex()));
        assert!(graph.has_edge(&commits[3].to_hex(), &commits[2].to_hex()));
        // b-pin's own budget still applies further down its spine.
        assert!(graph
            .nodes
            .iter()
            .any(|n| matches!(n, DisplayNode::Elided { id } if *id == commits[1])));
    }

    #[test]
    fn test_overlapping_walks_do_not_restart_runs() {
        let (store, tree) = fixture();
        // Two branch tips over one long shared chain: the second walk stops
        // at the first processed commit instead of re-collapsing the chain.
        let base = chain(&store, &tree, 6);
        let left = store.put_commit(&tree, &[base[5]], AUTHOR, AUTHOR, "left");
        let right = store.put_commit(&tree, &[base[5]], AUTHOR, AUTHOR, "right");
        store.refs().set("refs/heads/a-left", left);
        store.refs().set("refs/heads/b-right", right);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &collapse_options()).unwrap();

        // One summary for base[4]..base[1], produced exactly once.
        assert_eq!(graph.summaries().len(), 1);
        let keys: Vec<String> = graph.nodes.iter().map(DisplayNode::key).collect();
        let mut deduped = keys.clone();
        deduped.dedup();
        assert_eq!(keys, deduped);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let (store, tree) = fixture();
        let main = chain(&store, &tree, 8);
        let feature = store.put_commit(&tree, &[main[2]], AUTHOR, AUTHOR, "feature");
        let merge = store.put_commit(&tree, &[main[7], feature], AUTHOR, AUTHOR, "merge");
        store.refs().set("refs/heads/main", merge);
        let resolver = Resolver::new(store);

        let first = build_graph(&resolver, &collapse_options()).unwrap();
        let second = build_graph(&resolver, &collapse_options()).unwrap();

        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.short_id_len, second.short_id_len);
    }

    #[test]
    fn test_symbolic_head_node() {
        let (store, tree) = fixture();
        let tip = chain(&store, &tree, 1)[0];
        store.refs().set("refs/heads/main", tip);
        let resolver = Resolver::new(store);

        let graph = build_graph(&resolver, &GraphOptions::default()).unwrap();

        assert!(graph
            .nodes
            .iter()
            .any(|n| matches!(n, DisplayNode::Ref { name, ref_kind: RefKind::Head } if name == "HEAD")));
        assert!(graph.has_edge("HEAD", "refs/heads/main"));
    }
}
