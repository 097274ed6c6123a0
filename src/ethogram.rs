//! Ethogram mapping
//!
//! Joins raw behavior labels to their semantic categories. Labels are trimmed on
//! both sides before the join. Observations whose behavior has no category are
//! handled according to an explicit [`UnmappedPolicy`], identically for scan and
//! focal-event data.

use crate::config::UnmappedPolicy;
use crate::error::AnalysisError;
use crate::types::{CategorizedRecord, EthogramEntry, Observation};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Behavior → category lookup built from the reference ethogram
#[derive(Debug, Clone, Default)]
pub struct Ethogram {
    lookup: HashMap<String, String>,
    /// Distinct categories in first-seen order
    categories: Vec<String>,
}

impl Ethogram {
    /// Build the lookup. Rows without a category are ignored; a behavior listed
    /// under two different categories is an error.
    pub fn new<I>(entries: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = EthogramEntry>,
    {
        let mut lookup: HashMap<String, String> = HashMap::new();
        let mut categories: Vec<String> = Vec::new();

        for entry in entries {
            let behavior = entry.behavior.trim();
            let category = match entry.category.as_deref().map(str::trim) {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            if behavior.is_empty() {
                continue;
            }

            match lookup.get(behavior) {
                Some(existing) if existing != category => {
                    return Err(AnalysisError::EthogramConflict {
                        behavior: behavior.to_string(),
                        first: existing.clone(),
                        second: category.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    lookup.insert(behavior.to_string(), category.to_string());
                }
            }

            if !categories.iter().any(|c| c == category) {
                categories.push(category.to_string());
            }
        }

        Ok(Self { lookup, categories })
    }

    /// Category of a behavior label (whitespace-insensitive at the ends)
    pub fn category_of(&self, behavior: &str) -> Option<&str> {
        self.lookup.get(behavior.trim()).map(String::as_str)
    }

    /// Distinct categories in ethogram order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// The full category universe: every ethogram category, plus the
    /// unclassified label when given (and not already a category).
    pub fn universe(&self, unclassified: Option<&str>) -> Vec<String> {
        let mut universe = self.categories.clone();
        if let Some(label) = unclassified {
            if !universe.iter().any(|c| c == label) {
                universe.push(label.to_string());
            }
        }
        universe
    }

    /// Attach categories to observations.
    pub fn map_records<O>(
        &self,
        observations: &[O],
        policy: UnmappedPolicy,
        unclassified_label: &str,
    ) -> Result<MappedRecords<O::Key>, AnalysisError>
    where
        O: Observation,
    {
        let mut records = Vec::with_capacity(observations.len());
        let mut unmapped = UnmappedSummary::default();

        for obs in observations {
            let behavior = obs.behavior().trim();
            let category = match self.category_of(behavior) {
                Some(category) => category,
                None => {
                    unmapped.add(behavior, obs.count());
                    match policy {
                        UnmappedPolicy::Unclassified => unclassified_label,
                        UnmappedPolicy::Drop | UnmappedPolicy::Fail => continue,
                    }
                }
            };

            records.push(CategorizedRecord {
                key: obs.group_key(),
                behavior: behavior.to_string(),
                category: category.to_string(),
                count: obs.count(),
            });
        }

        if !unmapped.is_empty() {
            if policy == UnmappedPolicy::Fail {
                return Err(AnalysisError::UnmappedBehaviors(unmapped.describe()));
            }
            warn!(
                records = unmapped.records(),
                policy = policy.as_str(),
                "behaviors missing from ethogram: {}",
                unmapped.describe()
            );
        }

        Ok(MappedRecords {
            records,
            unmapped,
            policy,
        })
    }
}

/// Unmapped behavior labels with their summed counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnmappedSummary {
    counts: BTreeMap<String, u64>,
    records: usize,
}

impl UnmappedSummary {
    fn add(&mut self, behavior: &str, count: u64) {
        *self.counts.entry(behavior.to_string()).or_insert(0) += count;
        self.records += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Number of unmapped observation rows
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn describe(&self) -> String {
        self.counts
            .iter()
            .map(|(label, count)| format!("{label:?} ({count})"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of an ethogram join
#[derive(Debug, Clone)]
pub struct MappedRecords<K> {
    pub records: Vec<CategorizedRecord<K>>,
    pub unmapped: UnmappedSummary,
    policy: UnmappedPolicy,
}

impl<K> MappedRecords<K> {
    /// True when at least one record was routed to the unclassified category
    pub fn uses_unclassified(&self) -> bool {
        self.policy == UnmappedPolicy::Unclassified && !self.unmapped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventObservation, ScanObservation};
    use pretty_assertions::assert_eq;

    fn entry(behavior: &str, category: Option<&str>) -> EthogramEntry {
        EthogramEntry {
            behavior: behavior.to_string(),
            category: category.map(str::to_string),
        }
    }

    fn scan(day: u32, scan: u32, behavior: &str, count: u64) -> ScanObservation {
        ScanObservation {
            day,
            scan,
            behavior: behavior.to_string(),
            count,
        }
    }

    fn sample_ethogram() -> Ethogram {
        Ethogram::new(vec![
            entry("Graze", Some("Feeding")),
            entry("Sleep", Some("Resting")),
            entry("Chew", Some("Feeding")),
            entry("Stare", None),
        ])
        .unwrap()
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let ethogram = sample_ethogram();
        assert_eq!(ethogram.categories(), &["Feeding", "Resting"]);
        assert_eq!(ethogram.len(), 3);
        assert_eq!(ethogram.category_of("Stare"), None);
    }

    #[test]
    fn test_whitespace_trimmed_on_both_sides() {
        let ethogram = Ethogram::new(vec![entry(" Graze ", Some("Feeding "))]).unwrap();
        assert_eq!(ethogram.category_of("Graze"), Some("Feeding"));
        assert_eq!(ethogram.category_of("  Graze\t"), Some("Feeding"));
    }

    #[test]
    fn test_conflicting_duplicate_rejected() {
        let result = Ethogram::new(vec![
            entry("Graze", Some("Feeding")),
            entry("Graze", Some("Resting")),
        ]);
        assert!(matches!(result, Err(AnalysisError::EthogramConflict { .. })));

        // identical duplicates are fine
        let ethogram = Ethogram::new(vec![
            entry("Graze", Some("Feeding")),
            entry("Graze", Some("Feeding")),
        ])
        .unwrap();
        assert_eq!(ethogram.len(), 1);
    }

    #[test]
    fn test_universe_with_unclassified() {
        let ethogram = sample_ethogram();
        assert_eq!(ethogram.universe(None), vec!["Feeding", "Resting"]);
        assert_eq!(
            ethogram.universe(Some("Unclassified")),
            vec!["Feeding", "Resting", "Unclassified"]
        );
        assert_eq!(ethogram.universe(Some("Feeding")), vec!["Feeding", "Resting"]);
    }

    #[test]
    fn test_unclassified_policy_keeps_counts() {
        let ethogram = sample_ethogram();
        let scans = vec![
            scan(1, 1, "Graze ", 4),
            scan(1, 1, "Stare", 2),
            scan(1, 2, "Dance", 1),
        ];

        let mapped = ethogram
            .map_records(&scans, UnmappedPolicy::Unclassified, "Unclassified")
            .unwrap();

        assert_eq!(mapped.records.len(), 3);
        assert_eq!(mapped.records[0].behavior, "Graze");
        assert_eq!(mapped.records[0].category, "Feeding");
        assert_eq!(mapped.records[1].category, "Unclassified");
        assert_eq!(mapped.unmapped.records(), 2);
        assert_eq!(
            mapped.unmapped.labels().collect::<Vec<_>>(),
            vec![("Dance", 1), ("Stare", 2)]
        );
        assert!(mapped.uses_unclassified());
    }

    #[test]
    fn test_drop_policy_removes_records() {
        let ethogram = sample_ethogram();
        let events = vec![
            EventObservation {
                event: 1,
                behavior: "Sleep".to_string(),
                count: 3,
            },
            EventObservation {
                event: 1,
                behavior: "Dance".to_string(),
                count: 5,
            },
        ];

        let mapped = ethogram
            .map_records(&events, UnmappedPolicy::Drop, "Unclassified")
            .unwrap();

        assert_eq!(mapped.records.len(), 1);
        assert_eq!(mapped.records[0].key, 1);
        assert_eq!(mapped.unmapped.records(), 1);
        assert!(!mapped.uses_unclassified());
    }

    #[test]
    fn test_fail_policy_names_labels() {
        let ethogram = sample_ethogram();
        let scans = vec![scan(1, 1, "Dance", 1)];

        let err = ethogram
            .map_records(&scans, UnmappedPolicy::Fail, "Unclassified")
            .unwrap_err();

        match err {
            AnalysisError::UnmappedBehaviors(msg) => assert!(msg.contains("Dance")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fully_mapped_input_reports_nothing() {
        let ethogram = sample_ethogram();
        let scans = vec![scan(1, 1, "Graze", 8), scan(1, 1, "Sleep", 2)];
        let mapped = ethogram
            .map_records(&scans, UnmappedPolicy::Fail, "Unclassified")
            .unwrap();
        assert!(mapped.unmapped.is_empty());
        assert_eq!(mapped.records.len(), 2);
    }
}
