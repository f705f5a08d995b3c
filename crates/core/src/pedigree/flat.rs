use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::types::IndividualId;

/// Which way the walk that produced a tree went from its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Walk {
    /// Child -> parent (ancestor trees).
    Up,
    /// Parent -> child (descendant trees).
    Down,
}

/// A traversal tree reduced to plain sets: a layer per id and every
/// parent -> child edge crossed.
///
/// Layers are longest-path distances from the root over the collected
/// edges, so on the ancestor side a parent is strictly deeper than each of
/// its children (and strictly shallower on the descendant side), with or
/// without a depth bound on the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTree {
    pub root: IndividualId,
    pub depths: BTreeMap<IndividualId, usize>,
    /// `(parent, child)` pairs.
    pub edges: BTreeSet<(IndividualId, IndividualId)>,
}

impl FlatTree {
    /// Layer `edges` outward from `root` in topological order.
    ///
    /// The edge set comes from a finished, cycle-checked tree. Every id in it
    /// is reachable from the root.
    pub(crate) fn layered(
        root: IndividualId,
        edges: BTreeSet<(IndividualId, IndividualId)>,
        walk: Walk,
    ) -> Self {
        let outward = |&(parent, child): &(IndividualId, IndividualId)| match walk {
            Walk::Up => (child, parent),
            Walk::Down => (parent, child),
        };

        let mut next: HashMap<IndividualId, Vec<IndividualId>> = HashMap::new();
        let mut in_degree: HashMap<IndividualId, usize> = HashMap::new();
        in_degree.insert(root, 0);
        for edge in &edges {
            let (near, far) = outward(edge);
            next.entry(near).or_default().push(far);
            in_degree.entry(near).or_insert(0);
            *in_degree.entry(far).or_insert(0) += 1;
        }

        let mut depths = BTreeMap::new();
        depths.insert(root, 0);
        let mut queue: VecDeque<IndividualId> = VecDeque::from([root]);

        while let Some(id) = queue.pop_front() {
            let depth = depths.get(&id).copied().unwrap_or(0);
            for &far in next.get(&id).into_iter().flatten() {
                let entry = depths.entry(far).or_insert(0);
                *entry = (*entry).max(depth + 1);
                if let Some(d) = in_degree.get_mut(&far) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(far);
                    }
                }
            }
        }

        Self {
            root,
            depths,
            edges,
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.depths.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: IndividualId) -> bool {
        self.depths.contains_key(&id)
    }
}
