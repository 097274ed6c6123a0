//! Social role classification
//!
//! Roles are relative: within one category, each individual's W_NET is
//! compared with the 25th and 75th percentiles of W_NET across the roster.

use crate::quantile::Quantiles;
use crate::types::{LedgerEntry, Role, RoleAssignment};
use tracing::info;

/// Quartile cut points of W_NET within one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleThresholds {
    pub p25: f64,
    pub p75: f64,
}

impl RoleThresholds {
    /// `None` when no entry of the slice carries a W_NET
    pub fn from_entries<'a, I>(entries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let q = Quantiles::new(entries.into_iter().filter_map(|e| e.w_net), &[0.25, 0.75]);
        Some(Self {
            p25: q.get(0.25)?,
            p75: q.get(0.75)?,
        })
    }

    /// First matching rule wins
    pub fn role(&self, entry: &LedgerEntry) -> Option<Role> {
        let w_net = entry.w_net?;
        let role = if entry.total == 0 {
            Role::Isolated
        } else if w_net >= self.p75 {
            Role::PrimaryActor
        } else if w_net > 0.0 {
            Role::SecondaryActor
        } else if w_net <= self.p25 {
            Role::PrimaryReceiver
        } else {
            Role::Peripheral
        };
        Some(role)
    }
}

/// Assign roles per category. Output is category-major in `categories` order,
/// roster order within a category.
pub fn classify_roles(entries: &[LedgerEntry], categories: &[String]) -> Vec<RoleAssignment> {
    let mut assignments = Vec::with_capacity(entries.len());

    for category in categories {
        let slice: Vec<&LedgerEntry> = entries.iter().filter(|e| e.category == *category).collect();
        let thresholds = RoleThresholds::from_entries(slice.iter().copied());

        for entry in slice {
            assignments.push(RoleAssignment {
                entry: entry.clone(),
                role: thresholds.and_then(|t| t.role(entry)),
                system: category.clone(),
            });
        }
    }

    info!(
        assignments = assignments.len(),
        unclassified = assignments.iter().filter(|a| a.role.is_none()).count(),
        "classified social roles"
    );
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(individual: &str, out: u64, inbound: u64, weight: Option<f64>) -> LedgerEntry {
        let net = out as i64 - inbound as i64;
        let total = out + inbound;
        LedgerEntry {
            individual: individual.to_string(),
            category: "Agonista".to_string(),
            out,
            inbound,
            net,
            weight,
            w_net: weight.map(|w| net as f64 * w),
            total,
            bias: if total > 0 { net as f64 / total as f64 } else { 0.0 },
        }
    }

    fn roles(entries: &[LedgerEntry]) -> Vec<Option<Role>> {
        classify_roles(entries, &["Agonista".to_string()])
            .into_iter()
            .map(|a| a.role)
            .collect()
    }

    #[test]
    fn test_two_individual_boundaries() {
        let entries = vec![entry("A", 5, 1, Some(2.0)), entry("B", 1, 5, Some(2.0))];
        assert_eq!(
            roles(&entries),
            vec![Some(Role::PrimaryActor), Some(Role::PrimaryReceiver)]
        );
    }

    #[test]
    fn test_all_rules() {
        let entries = vec![
            entry("N1", 10, 0, Some(1.0)),
            entry("N2", 3, 1, Some(1.0)),
            entry("N3", 2, 2, Some(1.0)),
            entry("N4", 0, 0, Some(1.0)),
            entry("N5", 1, 6, Some(1.0)),
            entry("N6", 0, 10, Some(1.0)),
            entry("N7", 2, 3, Some(1.0)),
        ];
        // W_NET: 10, 2, 0, 0, -5, -10, -1 → p25 = -3, p75 = 1
        assert_eq!(
            roles(&entries),
            vec![
                Some(Role::PrimaryActor),
                Some(Role::PrimaryActor),
                Some(Role::Peripheral),
                Some(Role::Isolated),
                Some(Role::PrimaryReceiver),
                Some(Role::PrimaryReceiver),
                Some(Role::Peripheral),
            ]
        );
    }

    #[test]
    fn test_secondary_actor() {
        let entries = vec![
            entry("N1", 9, 0, Some(1.0)),
            entry("N2", 8, 0, Some(1.0)),
            entry("N3", 2, 1, Some(1.0)),
            entry("N4", 0, 18, Some(1.0)),
        ];
        // W_NET: 9, 8, 1, -18 → p75 = 8.25
        assert_eq!(
            roles(&entries),
            vec![
                Some(Role::PrimaryActor),
                Some(Role::SecondaryActor),
                Some(Role::SecondaryActor),
                Some(Role::PrimaryReceiver),
            ]
        );
    }

    #[test]
    fn test_degenerate_distribution_prefers_primary_actor() {
        // A→B 1, B→A 1; C never interacts. W_NET is 0 for everyone, so
        // p25 == p75 == 0 and both A and B sit on both quartiles.
        let entries = vec![
            entry("A", 1, 1, Some(1.0)),
            entry("B", 1, 1, Some(1.0)),
            entry("C", 0, 0, Some(1.0)),
        ];
        assert_eq!(
            roles(&entries),
            vec![
                Some(Role::PrimaryActor),
                Some(Role::PrimaryActor),
                Some(Role::Isolated),
            ]
        );
    }

    #[test]
    fn test_missing_weight_gives_no_role() {
        let entries = vec![entry("A", 5, 1, None), entry("B", 0, 0, None)];
        let assignments = classify_roles(&entries, &["Agonista".to_string()]);
        assert!(assignments.iter().all(|a| a.role.is_none()));
        assert!(assignments.iter().all(|a| a.system == "Agonista"));
    }
}
