use serde::{Deserialize, Serialize};

use crate::types::IndividualId;

/// A single individual: id, owner or display name, and up to two parents.
///
/// Parent links are stored as ids, not resolved references. Links to ids
/// that are not part of the population are tolerated and treated as an
/// unknown parent by every traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    /// Owner address or display name. Empty when unknown.
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub left_parent: Option<IndividualId>,
    #[serde(default)]
    pub right_parent: Option<IndividualId>,
    /// Inbreeding value reported by the data source, if it publishes one.
    /// Informational only; the engine computes its own coefficient.
    #[serde(default)]
    pub reported_coi: Option<f64>,
}

impl Individual {
    /// Create a founder (no recorded parents).
    pub fn new(id: IndividualId, owner: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
            left_parent: None,
            right_parent: None,
            reported_coi: None,
        }
    }

    /// Set both parent links.
    pub fn with_parents(
        mut self,
        left: Option<IndividualId>,
        right: Option<IndividualId>,
    ) -> Self {
        self.left_parent = left;
        self.right_parent = right;
        self
    }

    pub fn with_reported_coi(mut self, coi: f64) -> Self {
        self.reported_coi = Some(coi);
        self
    }

    /// Recorded parent ids, left first. A parent listed on both sides is
    /// yielded twice.
    pub fn parents(&self) -> impl Iterator<Item = IndividualId> + '_ {
        self.left_parent.into_iter().chain(self.right_parent)
    }

    /// An individual with no recorded parents.
    pub fn is_founder(&self) -> bool {
        self.left_parent.is_none() && self.right_parent.is_none()
    }
}
