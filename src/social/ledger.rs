//! Directed interaction ledger
//!
//! Every individual of the roster gets one OUT/IN tally per social category,
//! zero when never observed. NET = OUT − IN. Rarity weighting turns NET into
//! W_NET so that categories observed rarely in the group scans count for more.

use super::LabelIndex;
use crate::baseline::CategoryBaseline;
use crate::config::SocialConfig;
use crate::error::AnalysisError;
use crate::types::{LedgerEntry, SocialInteraction};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Pinned and computed proportions may differ by at most this much
const PROPORTION_TOLERANCE: f64 = 1e-9;

/// Rarity weight per social category: `1 / global proportion`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights {
    weights: BTreeMap<String, Option<f64>>,
}

impl CategoryWeights {
    /// Weights from a proportion lookup. A missing or zero proportion leaves
    /// the category without a weight.
    pub fn from_proportions<F>(categories: &[String], proportion: F) -> Self
    where
        F: Fn(&str) -> Option<f64>,
    {
        let weights = categories
            .iter()
            .map(|c| (c.clone(), weight_of(proportion(c))))
            .collect();
        Self { weights }
    }

    /// Pinned proportions from the configuration when present, otherwise the
    /// baseline of the same run. Disagreement between the two is logged.
    pub fn resolve(config: &SocialConfig, baseline: Option<&CategoryBaseline>) -> Self {
        match (&config.category_proportions, baseline) {
            (Some(pinned), baseline) => {
                if let Some(baseline) = baseline {
                    for (category, &p) in pinned {
                        let computed = baseline.get(category).unwrap_or(0.0);
                        if (computed - p).abs() > PROPORTION_TOLERANCE {
                            warn!(
                                category = category.as_str(),
                                pinned = p,
                                computed,
                                "pinned category proportion differs from baseline"
                            );
                        }
                    }
                }
                Self::from_proportions(&config.categories, |c| pinned.get(c).copied())
            }
            (None, Some(baseline)) => Self::from_proportions(&config.categories, |c| baseline.get(c)),
            (None, None) => Self::from_proportions(&config.categories, |_| None),
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.weights.get(category).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

fn weight_of(proportion: Option<f64>) -> Option<f64> {
    proportion.filter(|p| *p > 0.0).map(|p| 1.0 / p)
}

/// OUT/IN tallies over a fixed roster × category table
#[derive(Debug, Clone)]
pub struct SocialLedger {
    roster: LabelIndex,
    categories: LabelIndex,
    /// `[out, in]` at `individual * categories.len() + category`
    tallies: Vec<[u64; 2]>,
}

impl SocialLedger {
    /// Tally interactions. Records in categories outside `categories` are
    /// ignored; an actor or target outside the roster is an error.
    pub fn build(
        interactions: &[SocialInteraction],
        roster: &[String],
        categories: &[String],
    ) -> Result<Self, AnalysisError> {
        let roster = LabelIndex::new(roster.iter().cloned());
        let categories = LabelIndex::new(categories.iter().cloned());
        let mut tallies = vec![[0u64; 2]; roster.len() * categories.len()];

        let mut recognized = 0usize;
        for record in interactions {
            let Some(c) = categories.position(record.category.trim()) else {
                continue;
            };
            let actor = lookup(&roster, &record.actor)?;
            let target = lookup(&roster, &record.target)?;

            tally(&mut tallies[actor * categories.len() + c], 0, record)?;
            tally(&mut tallies[target * categories.len() + c], 1, record)?;
            recognized += 1;
        }

        info!(
            records = interactions.len(),
            recognized,
            individuals = roster.len(),
            "built social ledger"
        );

        Ok(Self {
            roster,
            categories,
            tallies,
        })
    }

    fn slot(&self, individual: &str, category: &str) -> Option<[u64; 2]> {
        let i = self.roster.position(individual)?;
        let c = self.categories.position(category)?;
        Some(self.tallies[i * self.categories.len() + c])
    }

    pub fn out(&self, individual: &str, category: &str) -> Option<u64> {
        self.slot(individual, category).map(|s| s[0])
    }

    pub fn inbound(&self, individual: &str, category: &str) -> Option<u64> {
        self.slot(individual, category).map(|s| s[1])
    }

    pub fn roster(&self) -> &[String] {
        self.roster.labels()
    }

    pub fn categories(&self) -> &[String] {
        self.categories.labels()
    }

    /// Weighted ledger rows, individual-major in roster order
    pub fn entries(&self, weights: &CategoryWeights) -> Vec<LedgerEntry> {
        let mut entries = Vec::with_capacity(self.tallies.len());
        for (i, individual) in self.roster.labels().iter().enumerate() {
            for (c, category) in self.categories.labels().iter().enumerate() {
                // OUT + IN fits in i64, see `tally`
                let [out, inbound] = self.tallies[i * self.categories.len() + c];
                let net = out as i64 - inbound as i64;
                let total = out + inbound;
                let weight = weights.get(category);
                entries.push(LedgerEntry {
                    individual: individual.clone(),
                    category: category.clone(),
                    out,
                    inbound,
                    net,
                    weight,
                    w_net: weight.map(|w| net as f64 * w),
                    total,
                    bias: if total > 0 {
                        net as f64 / total as f64
                    } else {
                        0.0
                    },
                });
            }
        }
        entries
    }
}

/// Add the record's count to one side (`0` = OUT, `1` = IN) of a slot. The
/// slot's OUT + IN must stay representable as `i64`.
fn tally(slot: &mut [u64; 2], side: usize, record: &SocialInteraction) -> Result<(), AnalysisError> {
    let updated = slot[side].checked_add(record.count);
    let total = updated
        .and_then(|v| v.checked_add(slot[1 - side]))
        .and_then(|t| i64::try_from(t).ok());
    match (updated, total) {
        (Some(value), Some(_)) => {
            slot[side] = value;
            Ok(())
        }
        _ => Err(AnalysisError::InvalidRecord(format!(
            "{} -> {} ({}): count {} overflows the ledger",
            record.actor.trim(),
            record.target.trim(),
            record.category.trim(),
            record.count
        ))),
    }
}

fn lookup(roster: &LabelIndex, label: &str) -> Result<usize, AnalysisError> {
    roster
        .position(label.trim())
        .ok_or_else(|| AnalysisError::UnknownIndividual(label.trim().to_string()))
}
