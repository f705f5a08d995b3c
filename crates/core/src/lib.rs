pub mod error;
pub mod pedigree;
pub mod population;
pub mod types;

pub use error::{PedigreeError, Result};
pub use pedigree::{query_pedigree, PedigreeDag, PedigreeSession, QueryOptions};
pub use population::{Individual, Population};
pub use types::{IndividualId, TraversalMode};
