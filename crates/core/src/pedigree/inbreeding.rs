use std::collections::HashMap;

use crate::error::Result;
use crate::population::Population;
use crate::types::IndividualId;

/// Ancestor-collision inbreeding counts for every individual of a population.
///
/// For an individual `x`, take every upward path from `x` through parent
/// links and write down the ancestor at the end of each path. The
/// coefficient is the number of entries in that multiset minus the number of
/// distinct ancestors in it:
///
/// ```text
/// coefficient(x) = occurrences(x) - distinct(x)
/// ```
///
/// An ancestor reachable through two lines of descent (a common ancestor of
/// both parents) adds one collision per extra path. This is a structural
/// count, not Wright's path coefficient; it carries no generation weighting
/// and is not normalised.
#[derive(Debug, Clone, Default)]
pub struct CoefficientTable {
    values: HashMap<IndividualId, u64>,
    max: u64,
}

impl CoefficientTable {
    /// Coefficient of `id`, or 0 for ids that are not in the table.
    pub fn get(&self, id: IndividualId) -> u64 {
        self.values.get(&id).copied().unwrap_or(0)
    }

    pub fn contains(&self, id: IndividualId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest coefficient in the table (0 for an empty table).
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Coefficient scaled to `[0, 1]` by the table maximum.
    ///
    /// Only meant for display scales such as colour gradients.
    pub fn normalized(&self, id: IndividualId) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.get(id) as f64 / self.max as f64
        }
    }

    /// All `(id, coefficient)` pairs, highest coefficient first, ties by id.
    pub fn ranked(&self) -> Vec<(IndividualId, u64)> {
        let mut rows: Vec<(IndividualId, u64)> =
            self.values.iter().map(|(&id, &c)| (id, c)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        rows
    }
}

/// Compute the coefficient table over the whole population.
///
/// Individuals are processed in topological order so both parents are done
/// before their offspring. Each individual keeps a map from ancestor id to
/// the number of distinct paths reaching it:
///
/// ```text
/// paths(x) = sum over parents p of ({p: 1} + paths(p))
/// ```
///
/// A parent id that is recorded but absent from the population counts as a
/// founder: it contributes its own occurrence and no further ancestors.
/// Path maps are dropped once every child of a parent has consumed them.
///
/// Path counts saturate at `u64::MAX` rather than overflowing on very deep
/// pedigrees with repeated full-sib mating.
///
/// # Errors
/// Returns [`crate::PedigreeError::CyclicPedigree`] if the parent relation
/// is cyclic. No partial table is produced.
pub fn compute_coefficients(population: &Population) -> Result<CoefficientTable> {
    let order = population.topological_order()?;

    // How many child links still need each parent's path map.
    let mut pending_children: HashMap<IndividualId, usize> = HashMap::new();
    for ind in population.iter() {
        for parent in ind.parents() {
            if population.contains(parent) {
                *pending_children.entry(parent).or_insert(0) += 1;
            }
        }
    }

    let mut paths: HashMap<IndividualId, HashMap<IndividualId, u64>> = HashMap::new();
    let mut values: HashMap<IndividualId, u64> = HashMap::with_capacity(order.len());
    let mut max = 0u64;

    for id in order {
        let Some(ind) = population.get(id) else {
            continue;
        };

        let mut counts: HashMap<IndividualId, u64> = HashMap::new();
        for parent in ind.parents() {
            let own = counts.entry(parent).or_insert(0);
            *own = own.saturating_add(1);

            if let Some(parent_paths) = paths.get(&parent) {
                for (&ancestor, &n) in parent_paths {
                    let entry = counts.entry(ancestor).or_insert(0);
                    *entry = entry.saturating_add(n);
                }
            }

            if let Some(pending) = pending_children.get_mut(&parent) {
                *pending -= 1;
                if *pending == 0 {
                    paths.remove(&parent);
                }
            }
        }

        let occurrences = counts.values().fold(0u64, |acc, &n| acc.saturating_add(n));
        let coefficient = occurrences - counts.len() as u64;
        max = max.max(coefficient);
        values.insert(id, coefficient);

        if pending_children.get(&id).copied().unwrap_or(0) > 0 {
            paths.insert(id, counts);
        }
    }

    log::info!(
        "Computed inbreeding counts for {} individuals (max {})",
        values.len(),
        max
    );

    Ok(CoefficientTable { values, max })
}
