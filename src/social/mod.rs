//! Social interaction analysis
//!
//! Directed interaction counts are tallied into a roster × category ledger,
//! weighted by how rare each interaction category is, and classified into
//! per-category social roles. The edge list and graph views feed the network
//! plots.
//!
//! Pipeline: interactions CSV → Ledger → Weights → Roles
//!                            ↘ Edge list → Graph views (DOT)

pub mod graph;
pub mod ledger;
pub mod roles;

pub use graph::{edge_list, RoleProfile, SocialGraph};
pub use ledger::{CategoryWeights, SocialLedger};
pub use roles::{classify_roles, RoleThresholds};

use std::collections::HashMap;

/// Fixed, ordered label set with O(1) position lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LabelIndex {
    /// Duplicate labels keep their first position
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::default();
        for label in labels {
            let label = label.into();
            if !index.positions.contains_key(&label) {
                index.positions.insert(label.clone(), index.labels.len());
                index.labels.push(label);
            }
        }
        index
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
