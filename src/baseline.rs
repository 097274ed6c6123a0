//! Category baseline
//!
//! The baseline is the global reference distribution of behavioral categories:
//! each category's summed count over every scan record divided by the grand
//! total. It gives every per-scan or per-event proportion something to be
//! compared against.

use crate::types::{BaselineEntry, CategorizedRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Global category distribution, one entry per category of the universe,
/// sorted by descending proportion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBaseline {
    entries: Vec<BaselineEntry>,
    /// Grand total of counts the proportions are relative to
    total_count: u64,
}

impl CategoryBaseline {
    /// Build the baseline from categorized records.
    ///
    /// Every category in `universe` gets exactly one entry; categories never
    /// observed get proportion 0. Records whose category is outside the
    /// universe still count towards the grand total. Ties in proportion keep
    /// universe order.
    pub fn build<K>(records: &[CategorizedRecord<K>], universe: &[String]) -> Self {
        let mut by_category: HashMap<&str, u64> = HashMap::new();
        let mut total_count: u64 = 0;

        for record in records {
            *by_category.entry(record.category.as_str()).or_insert(0) += record.count;
            total_count += record.count;
        }

        let mut entries: Vec<BaselineEntry> = universe
            .iter()
            .map(|category| {
                let count = by_category.get(category.as_str()).copied().unwrap_or(0);
                BaselineEntry {
                    category: category.clone(),
                    proportion: ratio(count, total_count),
                }
            })
            .collect();

        // stable sort: equal proportions stay in universe order
        entries.sort_by(|a, b| b.proportion.total_cmp(&a.proportion));

        info!(
            categories = entries.len(),
            total_count, "built category baseline"
        );

        Self {
            entries,
            total_count,
        }
    }

    /// Rebuild from stored entries (e.g. a previously written baseline table)
    pub fn from_entries(entries: Vec<BaselineEntry>) -> Self {
        Self {
            entries,
            total_count: 0,
        }
    }

    /// Baseline proportion of a category
    pub fn get(&self, category: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.proportion)
    }

    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    /// Categories in baseline (descending proportion) order
    pub fn categories(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.category.clone()).collect()
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all proportions (1.0 when every record falls in the universe)
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|e| e.proportion).sum()
    }

    /// Lookup table for joins
    pub fn as_map(&self) -> HashMap<&str, f64> {
        self.entries
            .iter()
            .map(|e| (e.category.as_str(), e.proportion))
            .collect()
    }
}

/// `count / total`, 0 when `total` is 0
pub(crate) fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanKey;
    use pretty_assertions::assert_eq;

    fn record(day: u32, scan: u32, category: &str, count: u64) -> CategorizedRecord<ScanKey> {
        CategorizedRecord {
            key: ScanKey::new(day, scan),
            behavior: format!("{category}-behavior"),
            category: category.to_string(),
            count,
        }
    }

    fn universe(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_graze_sleep_scenario() {
        let records = vec![record(1, 1, "Feeding", 8), record(1, 1, "Resting", 2)];
        let baseline = CategoryBaseline::build(&records, &universe(&["Feeding", "Resting"]));

        assert_eq!(baseline.len(), 2);
        assert!((baseline.get("Feeding").unwrap() - 0.8).abs() < 1e-12);
        assert!((baseline.get("Resting").unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(baseline.total_count(), 10);
    }

    #[test]
    fn test_zero_fill_and_descending_order() {
        let records = vec![
            record(1, 1, "Resting", 1),
            record(1, 2, "Feeding", 3),
            record(2, 1, "Feeding", 2),
        ];
        let baseline = CategoryBaseline::build(
            &records,
            &universe(&["Locomotion", "Resting", "Feeding", "Drinking"]),
        );

        assert_eq!(
            baseline.categories(),
            vec!["Feeding", "Resting", "Locomotion", "Drinking"]
        );
        assert_eq!(baseline.get("Locomotion"), Some(0.0));
        assert_eq!(baseline.get("Drinking"), Some(0.0));
        assert!((baseline.sum() - 1.0).abs() < 1e-12);
        assert!(baseline.entries().iter().all(|e| e.proportion >= 0.0));
    }

    #[test]
    fn test_empty_input_gives_zero_baseline() {
        let records: Vec<CategorizedRecord<ScanKey>> = Vec::new();
        let baseline = CategoryBaseline::build(&records, &universe(&["Feeding", "Resting"]));
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline.sum(), 0.0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let records = vec![
            record(1, 1, "Feeding", 5),
            record(1, 2, "Resting", 7),
            record(2, 1, "Exploring", 1),
        ];
        let cats = universe(&["Feeding", "Resting", "Exploring"]);
        let first = CategoryBaseline::build(&records, &cats);
        let second = CategoryBaseline::build(&records, &cats);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_category_counts_toward_total() {
        let records = vec![record(1, 1, "Feeding", 1), record(1, 1, "Mystery", 1)];
        let baseline = CategoryBaseline::build(&records, &universe(&["Feeding"]));
        assert_eq!(baseline.get("Feeding"), Some(0.5));
        assert_eq!(baseline.get("Mystery"), None);
    }

    #[test]
    fn test_serialization() {
        let records = vec![record(1, 1, "Feeding", 3), record(1, 1, "Resting", 1)];
        let baseline = CategoryBaseline::build(&records, &universe(&["Feeding", "Resting"]));
        let json = serde_json::to_string(&baseline).unwrap();
        let loaded: CategoryBaseline = serde_json::from_str(&json).unwrap();
        assert_eq!(baseline, loaded);
    }
}
