use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::error::{PedigreeError, Result};
use crate::population::Population;
use crate::types::IndividualId;

use super::flat::{FlatTree, Walk};

/// One individual in an ancestor tree.
///
/// `left` and `right` point at the parents' own nodes. A parent that is
/// unrecorded, missing from the population, or beyond the depth bound is
/// `None`.
#[derive(Debug, PartialEq)]
pub struct AncestorNode {
    pub id: IndividualId,
    /// Fewest generations between the root and this individual (root = 0).
    pub depth: usize,
    pub left: Option<Rc<AncestorNode>>,
    pub right: Option<Rc<AncestorNode>>,
}

impl AncestorNode {
    /// Parent nodes, left first.
    pub fn parents(&self) -> impl Iterator<Item = &AncestorNode> {
        self.left.as_deref().into_iter().chain(self.right.as_deref())
    }
}

impl Drop for AncestorNode {
    // Unlink parents iteratively so long lineages do not recurse on drop.
    fn drop(&mut self) {
        let mut stack: Vec<Rc<AncestorNode>> =
            self.left.take().into_iter().chain(self.right.take()).collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut node) = Rc::try_unwrap(node) {
                stack.extend(node.left.take());
                stack.extend(node.right.take());
            }
        }
    }
}

/// The ancestor tree of one root individual.
///
/// Every ancestor is built once and shared via [`Rc`] by all of its
/// offspring in the tree, so the structure is a tree when read top-down but
/// is stored as a DAG.
#[derive(Debug)]
pub struct AncestorTree {
    root: Rc<AncestorNode>,
    n_built: usize,
}

impl AncestorTree {
    pub fn root(&self) -> &AncestorNode {
        &self.root
    }

    /// Number of distinct nodes allocated while building.
    pub fn n_built(&self) -> usize {
        self.n_built
    }

    /// Reduce the tree to parent -> child edges and longest-path layers,
    /// visiting each shared node once.
    pub fn flatten(&self) -> FlatTree {
        let mut edges = BTreeSet::new();
        let mut seen: HashSet<IndividualId> = HashSet::new();
        let mut stack: Vec<&AncestorNode> = vec![self.root()];

        while let Some(node) = stack.pop() {
            if !seen.insert(node.id) {
                continue;
            }
            for parent in node.parents() {
                edges.insert((parent.id, node.id));
                stack.push(parent);
            }
        }

        FlatTree::layered(self.root.id, edges, Walk::Up)
    }
}

/// Build the ancestor tree of `root`.
///
/// Walks parent links upward. Each ancestor is placed at its shortest
/// distance from the root. When `max_depth` is `Some(d)`, ancestors within
/// `d` generations are kept and those at exactly `d` are not expanded;
/// `Some(0)` yields the root alone. `None` walks to the founders.
///
/// The walk uses explicit work stacks, so lineage length is bounded by
/// memory rather than by the call stack.
///
/// # Errors
/// - [`PedigreeError::NotFound`] if `root` is not in the population.
/// - [`PedigreeError::CyclicPedigree`] if an individual is reached again on
///   its own ancestor path.
pub fn build_ancestor_tree(
    population: &Population,
    root: IndividualId,
    max_depth: Option<usize>,
) -> Result<AncestorTree> {
    if !population.contains(root) {
        return Err(PedigreeError::NotFound(root));
    }

    let expands = |depth: usize| max_depth.map_or(true, |max| depth < max);

    // Shortest distance of every ancestor within the bound.
    let mut depth_of: HashMap<IndividualId, usize> = HashMap::new();
    depth_of.insert(root, 0);
    let mut queue: VecDeque<IndividualId> = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        let depth = depth_of.get(&id).copied().unwrap_or(0);
        if !expands(depth) {
            continue;
        }
        for parent in population.known_parents(id) {
            if !depth_of.contains_key(&parent) {
                depth_of.insert(parent, depth + 1);
                queue.push_back(parent);
            }
        }
    }

    // Post-order build: a node is created once both parents exist.
    let mut built: HashMap<IndividualId, Rc<AncestorNode>> = HashMap::new();
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
                    stack.extend(population.known_parents(id).map(Visit::Enter));
                }
            }
            Visit::Exit(id) => {
                on_path.remove(&id);
                let Some(ind) = population.get(id) else {
                    continue;
                };
                let depth = depth_of.get(&id).copied().unwrap_or(0);
                let link = |parent: Option<IndividualId>| {
                    parent
                        .filter(|_| expands(depth))
                        .and_then(|p| built.get(&p).cloned())
                };
                let node = Rc::new(AncestorNode {
                    id,
                    depth,
                    left: link(ind.left_parent),
                    right: link(ind.right_parent),
                });
                built.insert(id, node);
            }
        }
    }

    let node = built
        .get(&root)
        .cloned()
        .ok_or(PedigreeError::NotFound(root))?;

    log::debug!(
        "Ancestor tree of {}: {} distinct nodes (max depth {:?})",
        root,
        built.len(),
        max_depth
    );

    Ok(AncestorTree {
        root: node,
        n_built: built.len(),
    })
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    Enter(IndividualId),
    Exit(IndividualId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Individual;

    fn ind(id: IndividualId, left: Option<IndividualId>, right: Option<IndividualId>) -> Individual {
        Individual::new(id, "").with_parents(left, right)
    }

    fn diamond() -> Population {
        Population::from_records(vec![
            ind(1, None, None),
            ind(2, None, None),
            ind(3, Some(1), Some(2)),
            ind(4, Some(1), Some(2)),
            ind(5, Some(3), Some(4)),
        ])
        .unwrap()
    }

    fn assert_parents_within_one_generation(node: &AncestorNode) {
        for parent in node.parents() {
            assert!(parent.depth <= node.depth + 1, "edge {} -> {}", parent.id, node.id);
            assert!(parent.depth >= 1);
            assert_parents_within_one_generation(parent);
        }
    }

    /// 0 and 1 founders, then `k = (k - 1, k - 2)` up to `n - 1`.
    fn fibonacci(n: IndividualId) -> Population {
        let mut records = vec![ind(0, None, None), ind(1, None, None)];
        for k in 2..n {
            records.push(ind(k, Some(k - 1), Some(k - 2)));
        }
        Population::from_records(records).unwrap()
    }

    #[test]
    fn test_diamond_shares_common_ancestors() {
        let pop = diamond();
        let tree = build_ancestor_tree(&pop, 5, None).unwrap();
        let root = tree.root();

        assert_eq!(root.id, 5);
        assert_eq!(root.depth, 0);
        let three = root.left.as_ref().unwrap();
        let four = root.right.as_ref().unwrap();
        assert_eq!((three.id, four.id), (3, 4));

        // Founder 1 reached via 3 and via 4 is the same allocation.
        let one_via_three = three.left.as_ref().unwrap();
        let one_via_four = four.left.as_ref().unwrap();
        assert!(Rc::ptr_eq(one_via_three, one_via_four));
        assert_eq!(tree.n_built(), 5);
    }

    #[test]
    fn test_diamond_flattens_to_five_nodes() {
        let pop = diamond();
        let flat = build_ancestor_tree(&pop, 5, None).unwrap().flatten();
        assert_eq!(flat.depths.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(flat.n_edges(), 6);
        assert!(flat.edges.contains(&(1, 3)));
        assert!(flat.edges.contains(&(4, 5)));
        assert_eq!(flat.depths[&1], 2);
    }

    #[test]
    fn test_diamond_depths_are_generations() {
        let pop = diamond();
        let tree = build_ancestor_tree(&pop, 5, None).unwrap();
        assert_parents_within_one_generation(tree.root());
        let one = tree.root().left.as_ref().unwrap().left.as_ref().unwrap();
        assert_eq!(one.depth, 2);
    }

    #[test]
    fn test_max_depth_zero_is_root_only() {
        let pop = diamond();
        let tree = build_ancestor_tree(&pop, 5, Some(0)).unwrap();
        assert_eq!(tree.root().id, 5);
        assert!(tree.root().left.is_none());
        assert!(tree.root().right.is_none());
        assert_eq!(tree.flatten().n_nodes(), 1);
    }

    #[test]
    fn test_max_depth_one_stops_at_parents() {
        let pop = diamond();
        let flat = build_ancestor_tree(&pop, 5, Some(1)).unwrap().flatten();
        assert_eq!(flat.depths.keys().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let pop = diamond();
        assert!(matches!(
            build_ancestor_tree(&pop, 99, None),
            Err(PedigreeError::NotFound(99))
        ));
    }

    #[test]
    fn test_dangling_parent_pruned() {
        let pop = Population::from_records(vec![ind(1, None, None), ind(2, Some(1), Some(50))])
            .unwrap();
        let tree = build_ancestor_tree(&pop, 2, None).unwrap();
        assert_eq!(tree.root().left.as_ref().unwrap().id, 1);
        assert!(tree.root().right.is_none());
    }

    #[test]
    fn test_ancestor_at_two_depths() {
        // 3's parents are 1 and 2; 2's parent is 1. Founder 1 is one and two
        // generations up; the flattened layer is the deepest one.
        let pop = Population::from_records(vec![
            ind(1, None, None),
            ind(2, Some(1), None),
            ind(3, Some(1), Some(2)),
        ])
        .unwrap();
        let tree = build_ancestor_tree(&pop, 3, None).unwrap();
        assert_parents_within_one_generation(tree.root());

        // One node for 1, at its nearest distance, shared by 3 and 2.
        let root = tree.root();
        let one_direct = root.left.as_ref().unwrap();
        let one_via_two = root.right.as_ref().unwrap().left.as_ref().unwrap();
        assert!(Rc::ptr_eq(one_direct, one_via_two));
        assert_eq!(one_direct.depth, 1);
        assert_eq!(tree.n_built(), 3);

        let flat = tree.flatten();
        assert_eq!(flat.depths[&1], 2);
        assert_eq!(flat.depths[&2], 1);
        assert_eq!(flat.n_edges(), 3);
    }

    #[test]
    fn test_cycle_detected() {
        let pop = Population::from_records(vec![ind(1, Some(2), None), ind(2, Some(1), None)])
            .unwrap();
        assert!(matches!(
            build_ancestor_tree(&pop, 1, None),
            Err(PedigreeError::CyclicPedigree { .. })
        ));
    }

    #[test]
    fn test_self_parent_detected() {
        let pop = Population::from_records(vec![ind(1, Some(1), None)]).unwrap();
        assert!(matches!(
            build_ancestor_tree(&pop, 1, None),
            Err(PedigreeError::CyclicPedigree { .. })
        ));
    }

    #[test]
    fn test_deep_shared_pedigree_stays_linear() {
        // Each generation has two full sibs whose parents are the previous
        // pair: 2^g paths to the founders but only 2 nodes per generation.
        let generations = 40;
        let mut records = vec![ind(0, None, None), ind(1, None, None)];
        for g in 1..=generations {
            let (a, b) = (2 * (g - 1), 2 * (g - 1) + 1);
            records.push(ind(2 * g, Some(a), Some(b)));
            records.push(ind(2 * g + 1, Some(a), Some(b)));
        }
        let pop = Population::from_records(records).unwrap();
        let tree = build_ancestor_tree(&pop, 2 * generations, None).unwrap();
        assert_eq!(tree.n_built(), 2 * generations as usize + 1);
        assert_eq!(tree.flatten().n_nodes(), 2 * generations as usize + 1);
    }

    #[test]
    fn test_bounded_walk_keeps_layers_strict() {
        // 2 is a parent of 4 and a grandparent via 3; 1 is reached at the
        // bound through 2 only.
        let pop = Population::from_records(vec![
            ind(1, None, None),
            ind(2, Some(1), None),
            ind(3, Some(2), None),
            ind(4, Some(3), Some(2)),
        ])
        .unwrap();
        let tree = build_ancestor_tree(&pop, 4, Some(2)).unwrap();
        assert_eq!(tree.n_built(), 4);

        let flat = tree.flatten();
        assert_eq!(flat.depths.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        for (parent, child) in &flat.edges {
            assert!(
                flat.depths[parent] > flat.depths[child],
                "edge {} -> {} layered {} -> {}",
                parent,
                child,
                flat.depths[parent],
                flat.depths[child]
            );
        }
    }

    #[test]
    fn test_each_ancestor_built_once() {
        // Most ancestors are reachable at many different distances from the
        // root; each is still a single node.
        let pop = fibonacci(1000);
        let tree = build_ancestor_tree(&pop, 999, None).unwrap();
        assert_eq!(tree.n_built(), 1000);

        let flat = tree.flatten();
        assert_eq!(flat.n_nodes(), 1000);
        assert_eq!(flat.n_edges(), 2 * 998);
        assert_eq!(flat.depths[&0], 998);
        assert_eq!(flat.depths[&1], 998);
    }

    #[test]
    fn test_long_lineage_does_not_exhaust_stack() {
        let n: IndividualId = 100_000;
        let mut records = vec![ind(0, None, None)];
        for k in 1..n {
            records.push(ind(k, Some(k - 1), None));
        }
        let pop = Population::from_records(records).unwrap();

        let tree = build_ancestor_tree(&pop, n - 1, None).unwrap();
        assert_eq!(tree.n_built(), n as usize);
        let flat = tree.flatten();
        assert_eq!(flat.depths[&0], (n - 1) as usize);
        drop(tree);
    }
}
