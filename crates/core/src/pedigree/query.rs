use crate::error::{PedigreeError, Result};
use crate::population::Population;
use crate::types::{IndividualId, TraversalMode};

use super::ancestors::build_ancestor_tree;
use super::child_index::ChildIndex;
use super::dag::{assemble, PedigreeDag};
use super::descendants::build_descendant_tree;
use super::inbreeding::{compute_coefficients, CoefficientTable};

/// Parameters of a pedigree query.
///
/// Ancestor and descendant depth bounds are independent; `None` means
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub mode: TraversalMode,
    pub max_ancestor_depth: Option<usize>,
    pub max_descendant_depth: Option<usize>,
}

impl QueryOptions {
    /// Both directions, no depth bounds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound the ancestor walk (`Some(0)` keeps only the root).
    pub fn max_ancestor_depth(mut self, depth: Option<usize>) -> Self {
        self.max_ancestor_depth = depth;
        self
    }

    pub fn max_descendant_depth(mut self, depth: Option<usize>) -> Self {
        self.max_descendant_depth = depth;
        self
    }

    /// Apply the same bound to both directions.
    pub fn max_depth(self, depth: Option<usize>) -> Self {
        self.max_ancestor_depth(depth).max_descendant_depth(depth)
    }
}

/// Per-snapshot query state: the reverse child index and the coefficient
/// table, both built once and reused by every query on the same population.
///
/// A session borrows its population and owns everything else, so separate
/// sessions never share mutable state.
#[derive(Debug)]
pub struct PedigreeSession<'a> {
    population: &'a Population,
    index: ChildIndex,
    coefficients: CoefficientTable,
}

impl<'a> PedigreeSession<'a> {
    /// Prepare a session.
    ///
    /// # Errors
    /// Returns [`PedigreeError::CyclicPedigree`] if the population's parent
    /// relation is cyclic.
    pub fn new(population: &'a Population) -> Result<Self> {
        for (child, parent) in population.dangling_parents() {
            log::warn!(
                "Individual {} references parent {} which is not in the population",
                child,
                parent
            );
        }

        let coefficients = compute_coefficients(population)?;
        let index = ChildIndex::build(population);

        log::debug!(
            "Session ready: {} individuals, {} parents with offspring",
            population.len(),
            index.n_parents()
        );

        Ok(Self {
            population,
            index,
            coefficients,
        })
    }

    pub fn population(&self) -> &Population {
        self.population
    }

    pub fn child_index(&self) -> &ChildIndex {
        &self.index
    }

    pub fn coefficients(&self) -> &CoefficientTable {
        &self.coefficients
    }

    /// Build the pedigree graph around `root`.
    ///
    /// # Errors
    /// - [`PedigreeError::NotFound`] if `root` is not in the population.
    /// - [`PedigreeError::InvariantViolation`] if assembly breaks a graph
    ///   postcondition.
    pub fn query(&self, root: IndividualId, options: &QueryOptions) -> Result<PedigreeDag> {
        if !self.population.contains(root) {
            return Err(PedigreeError::NotFound(root));
        }

        let ancestors = if options.mode.includes_ancestors() {
            Some(build_ancestor_tree(
                self.population,
                root,
                options.max_ancestor_depth,
            )?)
        } else {
            None
        };

        let descendants = if options.mode.includes_descendants() {
            Some(build_descendant_tree(
                &self.index,
                root,
                options.max_descendant_depth,
            )?)
        } else {
            None
        };

        let mut dag = assemble(
            root,
            options.mode,
            ancestors.as_ref(),
            descendants.as_ref(),
            &self.coefficients,
        )?;
        dag.annotate_reported_coi(self.population);

        log::info!(
            "Pedigree of {} ({}): {} individuals, {} links",
            root,
            options.mode,
            dag.n_nodes(),
            dag.n_edges()
        );

        Ok(dag)
    }
}

/// One-shot query: build a session for `population` and answer a single
/// query.
///
/// # Errors
/// - [`PedigreeError::NotFound`] if `root` is not in the population.
/// - [`PedigreeError::CyclicPedigree`] if the parent relation is cyclic.
pub fn query_pedigree(
    population: &Population,
    root: IndividualId,
    options: &QueryOptions,
) -> Result<PedigreeDag> {
    if !population.contains(root) {
        return Err(PedigreeError::NotFound(root));
    }
    PedigreeSession::new(population)?.query(root, options)
}
