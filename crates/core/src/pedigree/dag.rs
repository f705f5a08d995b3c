use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Serialize, Serializer};

use crate::error::{PedigreeError, Result};
use crate::population::Population;
use crate::types::{IndividualId, TraversalMode};

use super::ancestors::AncestorTree;
use super::descendants::DescendantTree;
use super::flat::FlatTree;
use super::inbreeding::CoefficientTable;

/// Per-individual attributes of a DAG node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DagNode {
    /// Generation relative to the root: ancestors negative, descendants
    /// positive, root 0.
    pub level: i64,
    /// Ancestor-collision count from the [`CoefficientTable`].
    pub inbreeding: f64,
    /// The data source's own inbreeding value, when it provided one.
    pub reported_coi: Option<f64>,
}

/// The assembled pedigree graph around one root individual.
///
/// Nodes are unique per id; edges run parent -> child. The graph is
/// checked to be acyclic when assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct PedigreeDag {
    pub root: IndividualId,
    pub mode: TraversalMode,
    pub nodes: BTreeMap<IndividualId, DagNode>,
    /// `(parent, child)` pairs.
    pub edges: BTreeSet<(IndividualId, IndividualId)>,
}

impl PedigreeDag {
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: IndividualId) -> Option<&DagNode> {
        self.nodes.get(&id)
    }

    /// Ids grouped by level, lowest (oldest generation) first.
    pub fn levels(&self) -> BTreeMap<i64, Vec<IndividualId>> {
        let mut levels: BTreeMap<i64, Vec<IndividualId>> = BTreeMap::new();
        for (&id, node) in &self.nodes {
            levels.entry(node.level).or_default().push(id);
        }
        levels
    }

    /// Direct parents of `id` inside this graph.
    pub fn parents_of(&self, id: IndividualId) -> Vec<IndividualId> {
        self.edges
            .iter()
            .filter(|&&(_, c)| c == id)
            .map(|&(p, _)| p)
            .collect()
    }

    /// Direct children of `id` inside this graph.
    pub fn children_of(&self, id: IndividualId) -> Vec<IndividualId> {
        self.edges
            .range((id, IndividualId::MIN)..=(id, IndividualId::MAX))
            .map(|&(_, c)| c)
            .collect()
    }

    /// Copy the data source's own inbreeding values onto the nodes.
    pub fn annotate_reported_coi(&mut self, population: &Population) {
        for (id, node) in self.nodes.iter_mut() {
            node.reported_coi = population.get(*id).and_then(|ind| ind.reported_coi);
        }
    }

    /// Check the structural postconditions: every edge endpoint is a node,
    /// and the edge set is acyclic.
    ///
    /// # Errors
    /// Returns [`PedigreeError::InvariantViolation`] describing the first
    /// failure.
    pub fn check_invariants(&self) -> Result<()> {
        for &(parent, child) in &self.edges {
            if parent == child {
                return Err(PedigreeError::InvariantViolation(format!(
                    "self-loop on {}",
                    parent
                )));
            }
            if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
                return Err(PedigreeError::InvariantViolation(format!(
                    "edge {} -> {} references a node outside the graph",
                    parent, child
                )));
            }
        }

        // Kahn's algorithm over the assembled graph.
        let mut in_degree: HashMap<IndividualId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        for &(_, child) in &self.edges {
            if let Some(d) = in_degree.get_mut(&child) {
                *d += 1;
            }
        }

        let mut queue: VecDeque<IndividualId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut visited = 0usize;

        while let Some(id) = queue.pop_front() {
            visited += 1;
            for child in self.children_of(id) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            return Err(PedigreeError::InvariantViolation(format!(
                "assembled graph has a cycle through {} nodes",
                self.nodes.len() - visited
            )));
        }

        Ok(())
    }

    fn insert_layer(
        &mut self,
        flat: &FlatTree,
        sign: i64,
        coefficients: &CoefficientTable,
    ) -> Result<()> {
        for (&id, &depth) in &flat.depths {
            let level = sign * depth as i64;
            match self.nodes.get(&id) {
                Some(existing) if existing.level != level => {
                    return Err(PedigreeError::InvariantViolation(format!(
                        "individual {} placed at conflicting levels {} and {}",
                        id, existing.level, level
                    )));
                }
                Some(_) => {}
                None => {
                    self.nodes.insert(
                        id,
                        DagNode {
                            level,
                            inbreeding: coefficients.get(id) as f64,
                            reported_coi: None,
                        },
                    );
                }
            }
        }
        self.edges.extend(flat.edges.iter().copied());
        Ok(())
    }
}

/// Merge ancestor and descendant trees into one [`PedigreeDag`].
///
/// Which trees are required depends on `mode`; a tree passed for a
/// direction the mode does not include is ignored. The root is inserted
/// once at level 0 and shared by both sides.
///
/// # Errors
/// Returns [`PedigreeError::InvariantViolation`] if a required tree is
/// missing, a tree is rooted elsewhere, an individual lands on both sides of
/// the root, or the result is not acyclic.
pub fn assemble(
    root: IndividualId,
    mode: TraversalMode,
    ancestors: Option<&AncestorTree>,
    descendants: Option<&DescendantTree>,
    coefficients: &CoefficientTable,
) -> Result<PedigreeDag> {
    let mut dag = PedigreeDag {
        root,
        mode,
        nodes: BTreeMap::new(),
        edges: BTreeSet::new(),
    };
    dag.nodes.insert(
        root,
        DagNode {
            level: 0,
            inbreeding: coefficients.get(root) as f64,
            reported_coi: None,
        },
    );

    if mode.includes_ancestors() {
        let tree = ancestors.ok_or_else(|| {
            PedigreeError::InvariantViolation(format!("mode '{}' needs an ancestor tree", mode))
        })?;
        let flat = tree.flatten();
        check_root(&flat, root)?;
        dag.insert_layer(&flat, -1, coefficients)?;
    }

    if mode.includes_descendants() {
        let tree = descendants.ok_or_else(|| {
            PedigreeError::InvariantViolation(format!("mode '{}' needs a descendant tree", mode))
        })?;
        let flat = tree.flatten();
        check_root(&flat, root)?;
        dag.insert_layer(&flat, 1, coefficients)?;
    }

    dag.check_invariants()?;

    log::debug!(
        "Assembled {} graph for {}: {} nodes, {} edges",
        mode,
        root,
        dag.n_nodes(),
        dag.n_edges()
    );

    Ok(dag)
}

fn check_root(flat: &FlatTree, root: IndividualId) -> Result<()> {
    if flat.root != root {
        return Err(PedigreeError::InvariantViolation(format!(
            "tree rooted at {} cannot be assembled around {}",
            flat.root, root
        )));
    }
    Ok(())
}

/// Serialized shape: nodes as a list ordered by (level, id), edges as
/// `[parent, child]` pairs.
#[derive(Serialize)]
struct DagDocument {
    root: IndividualId,
    mode: TraversalMode,
    nodes: Vec<NodeDocument>,
    edges: Vec<(IndividualId, IndividualId)>,
}

#[derive(Serialize)]
struct NodeDocument {
    id: IndividualId,
    level: i64,
    inbreeding: f64,
    reported_coi: Option<f64>,
}

impl Serialize for PedigreeDag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut nodes: Vec<NodeDocument> = self
            .nodes
            .iter()
            .map(|(&id, n)| NodeDocument {
                id,
                level: n.level,
                inbreeding: n.inbreeding,
                reported_coi: n.reported_coi,
            })
            .collect();
        nodes.sort_by_key(|n| (n.level, n.id));

        DagDocument {
            root: self.root,
            mode: self.mode,
            nodes,
            edges: self.edges.iter().copied().collect(),
        }
        .serialize(serializer)
    }
}
