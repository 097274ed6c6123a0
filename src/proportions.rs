//! Per-group category proportions
//!
//! Turns categorized records into a dense GroupKey × Category grid: every
//! observed group gets one row per category of the universe, zero-filled when
//! the category was not seen in that group. Works for scan groups (day + scan)
//! and focal events alike.

use crate::baseline::ratio;
use crate::types::{CategorizedRecord, ProportionRow};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Dense proportion grid, ordered by group key then category order
#[derive(Debug, Clone, PartialEq)]
pub struct ProportionTable<K> {
    categories: Vec<String>,
    rows: Vec<ProportionRow<K>>,
}

impl<K: Ord + Clone> ProportionTable<K> {
    /// Aggregate records into the dense grid over `categories`.
    ///
    /// Group keys are the distinct keys of `records`. Records whose category is
    /// not in `categories` are excluded from both counts and totals.
    pub fn build(records: &[CategorizedRecord<K>], categories: &[String]) -> Self {
        let index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut counts: BTreeMap<K, Vec<u64>> = BTreeMap::new();
        let mut excluded = 0usize;

        for record in records {
            let slot = counts
                .entry(record.key.clone())
                .or_insert_with(|| vec![0; categories.len()]);
            match index.get(record.category.as_str()) {
                Some(&i) => slot[i] += record.count,
                None => excluded += 1,
            }
        }

        if excluded > 0 {
            debug!(excluded, "records outside the category universe skipped");
        }

        let mut rows = Vec::with_capacity(counts.len() * categories.len());
        for (key, group_counts) in counts {
            let total: u64 = group_counts.iter().sum();
            for (category, count) in categories.iter().zip(group_counts) {
                rows.push(ProportionRow {
                    key: key.clone(),
                    category: category.clone(),
                    count,
                    total,
                    proportion: ratio(count, total),
                });
            }
        }

        info!(
            rows = rows.len(),
            categories = categories.len(),
            "built proportion table"
        );

        Self {
            categories: categories.to_vec(),
            rows,
        }
    }

    /// Distinct group keys in ascending order
    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = Vec::new();
        for row in &self.rows {
            if keys.last() != Some(&row.key) {
                keys.push(row.key.clone());
            }
        }
        keys
    }

    /// Rows of one group, in category order
    pub fn group(&self, key: &K) -> impl Iterator<Item = &ProportionRow<K>> + '_ {
        let key = key.clone();
        self.rows.iter().filter(move |r| r.key == key)
    }

    /// Proportions of one category across all groups
    pub fn category_values<'a>(&'a self, category: &'a str) -> impl Iterator<Item = f64> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.category == category)
            .map(|r| r.proportion)
    }
}

impl<K> ProportionTable<K> {
    pub fn rows(&self) -> &[ProportionRow<K>] {
        &self.rows
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
