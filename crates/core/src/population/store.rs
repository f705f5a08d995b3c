use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::error::{PedigreeError, Result};
use crate::types::IndividualId;

use super::individual::Individual;

/// An immutable-by-convention snapshot of individuals keyed by id.
///
/// Individuals are kept in insertion order using an [`IndexMap`] so that
/// listings and topological orders are reproducible. No engine operation
/// depends on that order for its result.
///
/// Parent references may point at ids that are not in the population
/// (partial exports, filtered datasets). Those references are reported by
/// [`Population::dangling_parents`] and treated as unknown parents everywhere
/// else.
#[derive(Debug, Clone, Default)]
pub struct Population {
    individuals: IndexMap<IndividualId, Individual>,
}

impl Population {
    /// Create an empty population.
    pub fn new() -> Self {
        Self {
            individuals: IndexMap::new(),
        }
    }

    /// Build a population from individual records.
    ///
    /// # Errors
    /// Returns [`PedigreeError::DuplicateId`] if an id occurs twice.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Individual>,
    {
        let mut pop = Self::new();
        for ind in records {
            pop.insert(ind)?;
        }
        Ok(pop)
    }

    /// Add an individual.
    ///
    /// Parents do not have to be inserted first.
    ///
    /// # Errors
    /// Returns [`PedigreeError::DuplicateId`] if the id already exists.
    pub fn insert(&mut self, ind: Individual) -> Result<()> {
        if self.individuals.contains_key(&ind.id) {
            return Err(PedigreeError::DuplicateId(ind.id));
        }
        self.individuals.insert(ind.id, ind);
        Ok(())
    }

    /// Number of individuals.
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn get(&self, id: IndividualId) -> Option<&Individual> {
        self.individuals.get(&id)
    }

    pub fn contains(&self, id: IndividualId) -> bool {
        self.individuals.contains_key(&id)
    }

    /// Iterate over individuals in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.values()
    }

    /// Iterate over ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = IndividualId> + '_ {
        self.individuals.keys().copied()
    }

    /// Parent links of `id` that resolve to individuals in this population.
    ///
    /// Returns an empty iterator when `id` itself is unknown.
    pub fn known_parents(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|ind| ind.parents())
            .filter(move |p| self.contains(*p))
    }

    /// All `(child, missing_parent)` pairs where a parent link points at an
    /// id absent from the population.
    pub fn dangling_parents(&self) -> Vec<(IndividualId, IndividualId)> {
        self.iter()
            .flat_map(|ind| {
                ind.parents()
                    .filter(move |p| !self.contains(*p))
                    .map(move |p| (ind.id, p))
            })
            .collect()
    }

    /// Validate the pedigree for consistency.
    ///
    /// Checks:
    /// - No individual is listed as its own parent.
    /// - No individual is its own ancestor (cycle detection).
    ///
    /// Dangling parent references are not an error here; they are logged as
    /// warnings because every traversal prunes them.
    ///
    /// # Errors
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for ind in self.iter() {
            if ind.left_parent == Some(ind.id) {
                return Err(PedigreeError::Data(format!(
                    "Individual {} is listed as its own left parent",
                    ind.id
                )));
            }
            if ind.right_parent == Some(ind.id) {
                return Err(PedigreeError::Data(format!(
                    "Individual {} is listed as its own right parent",
                    ind.id
                )));
            }
        }

        for (child, parent) in self.dangling_parents() {
            log::warn!(
                "Individual {} references parent {} which is not in the population",
                child,
                parent
            );
        }

        self.topological_order().map(|_| ())
    }

    /// Order all ids so that every known parent precedes its offspring.
    ///
    /// Uses Kahn's algorithm over the parent -> child edges that resolve
    /// inside the population. Founders are seeded in insertion order, so the
    /// result is deterministic.
    ///
    /// # Errors
    /// Returns [`PedigreeError::CyclicPedigree`] if some individuals can never
    /// be ordered, i.e. the parent relation contains a cycle (self-parentage
    /// included).
    pub fn topological_order(&self) -> Result<Vec<IndividualId>> {
        let n = self.individuals.len();

        // Direction: parent -> child, over positions in the IndexMap.
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];

        for (i, ind) in self.individuals.values().enumerate() {
            for parent in ind.parents() {
                if let Some(p) = self.individuals.get_index_of(&parent) {
                    children_of[p].push(i);
                    in_degree[i] += 1;
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order: Vec<IndividualId> = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            if let Some((&id, _)) = self.individuals.get_index(node) {
                order.push(id);
            }
            for &child in &children_of[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() != n {
            return Err(PedigreeError::CyclicPedigree {
                unresolved: n - order.len(),
            });
        }

        Ok(order)
    }
}
