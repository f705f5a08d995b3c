use std::collections::{BTreeSet, HashMap};

use crate::population::Population;
use crate::types::IndividualId;

/// Reverse lookup from a parent id to the ids of its direct children.
///
/// Built once per query session so that descendant walks never rescan the
/// population. Children are kept in a [`BTreeSet`] for a stable walk order.
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    children: HashMap<IndividualId, BTreeSet<IndividualId>>,
}

impl ChildIndex {
    /// Build the index in a single pass over `population`.
    ///
    /// Every non-null parent link contributes an entry, including links to
    /// ids that are not themselves in the population.
    pub fn build(population: &Population) -> Self {
        let mut children: HashMap<IndividualId, BTreeSet<IndividualId>> = HashMap::new();
        for ind in population.iter() {
            for parent in ind.parents() {
                children.entry(parent).or_default().insert(ind.id);
            }
        }
        Self { children }
    }

    /// Direct children of `parent`; empty when it has none.
    pub fn children_of(&self, parent: IndividualId) -> impl Iterator<Item = IndividualId> + '_ {
        self.children.get(&parent).into_iter().flatten().copied()
    }

    pub fn has_children(&self, parent: IndividualId) -> bool {
        self.children
            .get(&parent)
            .map(|c| !c.is_empty())
            .unwrap_or(false)
    }

    /// Number of parents with at least one child.
    pub fn n_parents(&self) -> usize {
        self.children.len()
    }
}
