use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::error::{PedigreeError, Result};
use crate::types::IndividualId;

use super::child_index::ChildIndex;
use super::flat::{FlatTree, Walk};

/// One individual in a descendant tree.
#[derive(Debug, PartialEq)]
pub struct DescendantNode {
    pub id: IndividualId,
    /// Fewest generations between the root and this individual (root = 0).
    pub depth: usize,
    /// Direct children keyed by id. Empty for a leaf or at the depth bound.
    pub children: BTreeMap<IndividualId, Rc<DescendantNode>>,
}

impl DescendantNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Drop for DescendantNode {
    fn drop(&mut self) {
        let mut stack: Vec<Rc<DescendantNode>> =
            std::mem::take(&mut self.children).into_values().collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut node) = Rc::try_unwrap(node) {
                stack.extend(std::mem::take(&mut node.children).into_values());
            }
        }
    }
}

/// The descendant tree of one root individual.
#[derive(Debug)]
pub struct DescendantTree {
    root: Rc<DescendantNode>,
}

impl DescendantTree {
    pub fn root(&self) -> &DescendantNode {
        &self.root
    }

    pub fn flatten(&self) -> FlatTree {
        let mut edges = BTreeSet::new();
        let mut seen: HashSet<IndividualId> = HashSet::new();
        let mut stack: Vec<&DescendantNode> = vec![self.root()];

        while let Some(node) = stack.pop() {
            if !seen.insert(node.id) {
                continue;
            }
            for child in node.children.values() {
                edges.insert((node.id, child.id));
                stack.push(child);
            }
        }

        FlatTree::layered(self.root.id, edges, Walk::Down)
    }
}

/// Build the descendant tree of `root` from a prebuilt [`ChildIndex`].
///
/// The root does not have to appear in the index; an id without children
/// yields a single leaf node. Each descendant is built once, at its shortest
/// distance from the root, and `max_depth` bounds the walk the same way as
/// for ancestor trees.
///
/// # Errors
/// Returns [`PedigreeError::CyclicPedigree`] if an individual is reached
/// again on its own descendant path.
pub fn build_descendant_tree(
    index: &ChildIndex,
    root: IndividualId,
    max_depth: Option<usize>,
) -> Result<DescendantTree> {
    let expands = |depth: usize| max_depth.map_or(true, |max| depth < max);

    let mut depth_of: HashMap<IndividualId, usize> = HashMap::new();
    depth_of.insert(root, 0);
    let mut queue: VecDeque<IndividualId> = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        let depth = depth_of.get(&id).copied().unwrap_or(0);
        if !expands(depth) {
            continue;
        }
        for child in index.children_of(id) {
            if !depth_of.contains_key(&child) {
                depth_of.insert(child, depth + 1);
                queue.push_back(child);
            }
        }
    }

    let mut built: HashMap<IndividualId, Rc<DescendantNode>> = HashMap::new();
    let mut on_path: HashSet<IndividualId> = HashSet::new();
    let mut stack = vec![Visit::Enter(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id) => {
                if built.contains_key(&id) {
                    continue;
                }
                if !on_path.insert(id) {
                    return Err(PedigreeError::CyclicPedigree {
                        unresolved: on_path.len(),
                    });
                }
                stack.push(Visit::Exit(id));
                let depth = depth_of.get(&id).copied().unwrap_or(0);
                if expands(depth) {
                    stack.extend(index.children_of(id).map(Visit::Enter));
                }
            }
            Visit::Exit(id) => {
                on_path.remove(&id);
                let depth = depth_of.get(&id).copied().unwrap_or(0);
                let mut children = BTreeMap::new();
                if expands(depth) {
                    for child in index.children_of(id) {
                        if let Some(node) = built.get(&child) {
                            children.insert(child, Rc::clone(node));
                        }
                    }
                }
                built.insert(
                    id,
                    Rc::new(DescendantNode {
                        id,
                        depth,
                        children,
                    }),
                );
            }
        }
    }

    let node = built.get(&root).cloned().ok_or(PedigreeError::NotFound(root))?;

    log::debug!(
        "Descendant tree of {}: {} distinct nodes (max depth {:?})",
        root,
        built.len(),
        max_depth
    );

    Ok(DescendantTree { root: node })
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    Enter(IndividualId),
    Exit(IndividualId),
}
