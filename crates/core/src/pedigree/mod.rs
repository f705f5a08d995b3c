// Pedigree graph engine: reverse index, ancestor/descendant trees,
// inbreeding counts and DAG assembly.

mod ancestors;
mod child_index;
mod dag;
mod descendants;
mod export;
mod flat;
mod inbreeding;
mod query;

pub use ancestors::{build_ancestor_tree, AncestorNode, AncestorTree};
pub use child_index::ChildIndex;
pub use dag::{assemble, DagNode, PedigreeDag};
pub use descendants::{build_descendant_tree, DescendantNode, DescendantTree};
pub use flat::FlatTree;
pub use inbreeding::{compute_coefficients, CoefficientTable};
pub use query::{query_pedigree, PedigreeSession, QueryOptions};
