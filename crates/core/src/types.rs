use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PedigreeError;

/// The identifier type for individuals in a population.
pub type IndividualId = u64;

/// Which side of the root a pedigree query walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Parents, grandparents, ... up to the founders.
    Ancestors,
    /// Children, grandchildren, ...
    Descendants,
    /// Both directions, joined at the root.
    #[default]
    Both,
}

impl TraversalMode {
    pub fn includes_ancestors(self) -> bool {
        matches!(self, TraversalMode::Ancestors | TraversalMode::Both)
    }

    pub fn includes_descendants(self) -> bool {
        matches!(self, TraversalMode::Descendants | TraversalMode::Both)
    }
}

impl FromStr for TraversalMode {
    type Err = PedigreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ancestors" | "up" => Ok(TraversalMode::Ancestors),
            "descendants" | "down" => Ok(TraversalMode::Descendants),
            "both" | "full_tree" | "full" => Ok(TraversalMode::Both),
            other => Err(PedigreeError::Data(format!(
                "Unknown traversal mode '{}'. Use 'ancestors', 'descendants' or 'both'.",
                other
            ))),
        }
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraversalMode::Ancestors => "ancestors",
            TraversalMode::Descendants => "descendants",
            TraversalMode::Both => "both",
        };
        f.write_str(name)
    }
}
