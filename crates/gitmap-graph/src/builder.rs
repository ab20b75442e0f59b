//! Ref selection and the reachability pre-scan.
//!
//! The first of the two hard-ordered passes: starting from every selected
//! ref, walk each primary-parent spine to its root, re-seeding secondary
//! parents of merge commits as new spines, and record the reverse adjacency
//! (who names whom as a parent). Fan-in counts read by the collapsing pass
//! are complete only once this pass has finished.

use crate::collapse;
use crate::display::{DisplayGraph, RefKind};
use crate::object::{GitObject, ObjectArena};
use crate::Result;
use gitmap_odb::{ObjectId, ObjectQuery, Resolver};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Which refs seed the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefSelection {
    /// Every ref in the repository.
    #[default]
    All,
    /// Only the ref the head is on (the head commit itself when detached).
    HeadOnly,
    /// Every ref except remote-tracking refs.
    ExcludeRemotes,
}

/// Configuration threaded into the graph builder and collapsing engine.
#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    /// Ref selection policy.
    pub refs: RefSelection,
    /// Collapse maximal runs of boring commits into summary nodes.
    pub collapse: bool,
    /// Maximum commits shown per spine; the next commit is elided.
    pub max_depth: Option<usize>,
    /// Expand each retained commit's tree closure into the display set.
    pub include_trees_blobs: bool,
    /// Include the working-tree status node, if the store reports one.
    pub include_work_tree: bool,
}

/// Where a traversal seed came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOrigin {
    /// A selected ref.
    Ref {
        /// Full ref name.
        name: String,
        /// Ref classification for display labelling.
        kind: RefKind,
    },
    /// A secondary parent of a merge commit, discovered mid-scan.
    MergePath,
}

/// A traversal starting point.
#[derive(Debug, Clone)]
pub struct Seed {
    /// Origin of this seed.
    pub origin: SeedOrigin,
    /// Annotated tag the ref pointed through, if any.
    pub tag: Option<ObjectId>,
    /// Final peeled target object.
    pub target: ObjectId,
    /// The commit to walk from; `None` when the target is not a commit.
    pub tip: Option<ObjectId>,
}

/// Everything the pre-scan learned, consumed by the collapsing pass.
#[derive(Debug)]
pub struct Discovery {
    /// Ref seeds followed by merge-path seeds in discovery order.
    pub seeds: Vec<Seed>,
    /// Reverse adjacency: for each commit, the commits naming it as a
    /// parent, deduplicated, in discovery order. A commit's fan-in is the
    /// length of its entry.
    pub children: HashMap<ObjectId, Vec<ObjectId>>,
    /// Every commit reached by any spine.
    pub discovered: HashSet<ObjectId>,
    /// Short-identifier display length derived from the commit count.
    pub short_id_len: usize,
}

impl Discovery {
    /// Returns a commit's fan-in.
    pub fn fan_in(&self, id: &ObjectId) -> usize {
        self.children.get(id).map_or(0, Vec::len)
    }
}

/// Runs ref selection and the reachability pre-scan.
pub fn discover<Q: ObjectQuery>(
    resolver: &Resolver<Q>,
    arena: &mut ObjectArena,
    selection: RefSelection,
) -> Result<Discovery> {
    let refs = select_refs(resolver.query(), selection)?;
    let seeds = seed_refs(resolver, arena, &refs)?;
    pre_scan(resolver, arena, seeds)
}

/// Builds the display graph: pre-scan, then the collapse/assembly pass.
pub fn build_graph<Q: ObjectQuery>(
    resolver: &Resolver<Q>,
    options: &GraphOptions,
) -> Result<DisplayGraph> {
    let mut arena = ObjectArena::new();
    let discovery = discover(resolver, &mut arena, options.refs)?;
    collapse::assemble(resolver, &mut arena, &discovery, options)
}

fn select_refs<Q: ObjectQuery>(
    query: &Q,
    selection: RefSelection,
) -> Result<Vec<(String, ObjectId)>> {
    let refs = query.list_refs()?;
    let selected = match selection {
        RefSelection::All => refs,
        RefSelection::ExcludeRemotes => refs
            .into_iter()
            .filter(|(name, _)| !name.starts_with("refs/remotes/"))
            .collect(),
        RefSelection::HeadOnly => {
            let head = query.head()?;
            match head.branch {
                Some(branch) => {
                    let name = format!("refs/heads/{}", branch);
                    refs.into_iter().filter(|(n, _)| *n == name).collect()
                }
                // Detached head: walk from the head commit itself.
                None => vec![("HEAD".to_string(), head.target)],
            }
        }
    };
    Ok(selected)
}

/// Turns each selected ref into a seed, peeling annotated tags down to the
/// object they ultimately point at.
fn seed_refs<Q: ObjectQuery>(
    resolver: &Resolver<Q>,
    arena: &mut ObjectArena,
    refs: &[(String, ObjectId)],
) -> Result<Vec<Seed>> {
    let mut seeds = Vec::with_capacity(refs.len());
    for (name, ref_target) in refs {
        let kind = RefKind::classify(name);
        let mut tag = None;
        let mut target = *ref_target;
        loop {
            match arena.get_or_create(target, resolver)? {
                GitObject::Tag(t) => {
                    let peeled = *t.target(resolver)?;
                    if tag.is_none() {
                        tag = Some(target);
                    }
                    target = peeled.id;
                }
                _ => break,
            }
        }
        let tip = match arena.get(&target) {
            Some(GitObject::Commit(_)) => Some(target),
            _ => None,
        };
        seeds.push(Seed {
            origin: SeedOrigin::Ref {
                name: name.clone(),
                kind,
            },
            tag,
            target,
            tip,
        });
    }
    Ok(seeds)
}

/// Walks every seed's primary-parent spine, re-seeding secondary parents,
/// and builds the reverse adjacency.
fn pre_scan<Q: ObjectQuery>(
    resolver: &Resolver<Q>,
    arena: &mut ObjectArena,
    mut seeds: Vec<Seed>,
) -> Result<Discovery> {
    info!(refs = seeds.len(), "pre-scanning the object graph");

    let mut seed_tips: HashSet<ObjectId> = seeds.iter().filter_map(|s| s.tip).collect();
    let mut children: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
    let mut discovered: HashSet<ObjectId> = HashSet::new();

    let mut index = 0;
    while index < seeds.len() {
        let Some(tip) = seeds[index].tip else {
            index += 1;
            continue;
        };
        match &seeds[index].origin {
            SeedOrigin::Ref { name, .. } => info!(ref_name = %name, "scanning ref"),
            SeedOrigin::MergePath => debug!(commit = %tip, "scanning merge path"),
        }

        let mut current = tip;
        loop {
            discovered.insert(current);
            let parents = match arena
                .commit(current, resolver)
                .and_then(|c| c.parents(resolver).map(<[ObjectId]>::to_vec))
            {
                Ok(parents) => parents,
                Err(err) => {
                    match &seeds[index].origin {
                        SeedOrigin::Ref { name, .. } => {
                            error!(ref_name = %name, commit = %current, "traversal failed")
                        }
                        SeedOrigin::MergePath => error!(commit = %current, "traversal failed"),
                    }
                    return Err(err);
                }
            };
            let Some(&primary) = parents.first() else {
                break; // root
            };
            for &secondary in &parents[1..] {
                if seed_tips.insert(secondary) {
                    seeds.push(Seed {
                        origin: SeedOrigin::MergePath,
                        tag: None,
                        target: secondary,
                        tip: Some(secondary),
                    });
                }
                add_child(&mut children, secondary, current);
            }
            add_child(&mut children, primary, current);
            current = primary;
        }
        index += 1;
    }

    let commit_count = discovered.len();
    let short_id_len = short_id_len(commit_count);
    info!(
        commits = commit_count,
        short_id_len, "pre-scan finished"
    );

    Ok(Discovery {
        seeds,
        children,
        discovered,
        short_id_len,
    })
}

fn add_child(children: &mut HashMap<ObjectId, Vec<ObjectId>>, parent: ObjectId, child: ObjectId) {
    let entry = children.entry(parent).or_default();
    if !entry.contains(&child) {
        entry.push(child);
    }
}

/// Minimum prefix length for unambiguous short ids:
/// `max(5, ceil(log2(n) / 2))` over the number of discovered commits.
fn short_id_len(n: usize) -> usize {
    if n == 0 {
        return 5;
    }
    let bits = (n as f64).log2();
    ((bits / 2.0).ceil() as usize).max(5)
}
