//! Deviation from baseline
//!
//! Joins per-group proportions to the category baseline and derives the
//! signed deviation, plus three views built on top of it:
//! - [`DeviationMatrix`]: category × column pivot used by the heatmaps
//! - [`VariabilityBand`]: one category's deviation series for one day against
//!   its interquartile "normal range"
//! - [`deviation_limits`]: per-category P98 of absolute deviation

use crate::baseline::CategoryBaseline;
use crate::error::AnalysisError;
use crate::proportions::ProportionTable;
use crate::quantile::{quantile, Quantiles};
use crate::types::{DeviationRow, ScanKey};
use serde::Serialize;

/// Deviation engine over a fixed baseline
pub struct DeviationEngine<'a> {
    baseline: &'a CategoryBaseline,
}

impl<'a> DeviationEngine<'a> {
    pub fn new(baseline: &'a CategoryBaseline) -> Self {
        Self { baseline }
    }

    /// Left-join every proportion row to the baseline and compute
    /// `proportion - baseline`. No clamping or normalization is applied.
    pub fn apply<K: Clone>(&self, table: &ProportionTable<K>) -> Vec<DeviationRow<K>> {
        let lookup = self.baseline.as_map();
        table
            .rows()
            .iter()
            .map(|row| {
                let baseline = lookup.get(row.category.as_str()).copied();
                DeviationRow {
                    key: row.key.clone(),
                    category: row.category.clone(),
                    proportion: row.proportion,
                    baseline,
                    deviation: baseline.map(|b| row.proportion - b),
                }
            })
            .collect()
    }
}

impl<K> DeviationRow<K> {
    /// `baseline + deviation`, i.e. the original proportion
    pub fn reconstruct(&self) -> Option<f64> {
        match (self.baseline, self.deviation) {
            (Some(b), Some(d)) => Some(b + d),
            _ => None,
        }
    }
}

/// Category × column grid of deviations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationMatrix<C> {
    /// Row labels (categories) in baseline order
    pub categories: Vec<String>,
    /// Column labels in ascending order
    pub columns: Vec<C>,
    /// `values[row][col]`; `None` where no deviation exists
    pub values: Vec<Vec<Option<f64>>>,
}

impl<C: Ord + Clone> DeviationMatrix<C> {
    /// Pivot deviation rows. `column` maps a row key to its column, or `None`
    /// to leave the row out (e.g. rows of another day).
    pub fn pivot<K, F>(rows: &[DeviationRow<K>], categories: &[String], column: F) -> Self
    where
        F: Fn(&K) -> Option<C>,
    {
        let mut columns: Vec<C> = rows.iter().filter_map(|r| column(&r.key)).collect();
        columns.sort();
        columns.dedup();

        let mut values = vec![vec![None; columns.len()]; categories.len()];
        for row in rows {
            let Some(col) = column(&row.key) else {
                continue;
            };
            let Some(r) = categories.iter().position(|c| *c == row.category) else {
                continue;
            };
            if let Ok(c) = columns.binary_search(&col) {
                values[r][c] = row.deviation;
            }
        }

        Self {
            categories: categories.to_vec(),
            columns,
            values,
        }
    }

    pub fn get(&self, category: &str, column: &C) -> Option<f64> {
        let r = self.categories.iter().position(|c| c == category)?;
        let c = self.columns.binary_search(column).ok()?;
        self.values[r][c]
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One scan of a variability band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandPoint {
    pub scan: u32,
    pub deviation: f64,
    /// Deviation is large enough to label on the plot
    pub annotate: bool,
}

/// Deviation series of one category on one day against its normal range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariabilityBand {
    pub category: String,
    pub day: u32,
    pub baseline: f64,
    /// Q1 of the category's proportions across all days, minus the baseline
    pub lower: f64,
    /// Q3 of the category's proportions across all days, minus the baseline
    pub upper: f64,
    /// Display limit for the deviation axis
    pub limit: f64,
    /// Scan points sorted by scan
    pub points: Vec<BandPoint>,
}

impl VariabilityBand {
    /// Build the band for `category` on `day`. Points whose absolute deviation
    /// exceeds `annotate_fraction * limit` are marked for annotation.
    pub fn build(
        table: &ProportionTable<ScanKey>,
        baseline: &CategoryBaseline,
        category: &str,
        day: u32,
        limit: f64,
        annotate_fraction: f64,
    ) -> Result<Self, AnalysisError> {
        let base = baseline
            .get(category)
            .ok_or_else(|| AnalysisError::UnknownCategory(category.to_string()))?;

        let iqr = Quantiles::new(table.category_values(category), &[0.25, 0.75]);
        let (q1, q3) = match (iqr.get(0.25), iqr.get(0.75)) {
            (Some(q1), Some(q3)) => (q1, q3),
            _ => (base, base),
        };

        let mut points: Vec<BandPoint> = table
            .rows()
            .iter()
            .filter(|r| r.key.day == day && r.category == category)
            .map(|r| {
                let deviation = r.proportion - base;
                BandPoint {
                    scan: r.key.scan,
                    deviation,
                    annotate: deviation.abs() > limit * annotate_fraction,
                }
            })
            .collect();
        points.sort_by_key(|p| p.scan);

        Ok(Self {
            category: category.to_string(),
            day,
            baseline: base,
            lower: q1 - base,
            upper: q3 - base,
            limit,
            points,
        })
    }
}

/// Per-category magnitude of typical extreme deviation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationLimit {
    pub category: String,
    /// 98th percentile of |deviation|
    pub limit: f64,
}

/// P98 of absolute deviation per category, largest first
pub fn deviation_limits<K>(rows: &[DeviationRow<K>], categories: &[String]) -> Vec<DeviationLimit> {
    let mut limits: Vec<DeviationLimit> = categories
        .iter()
        .filter_map(|category| {
            let magnitudes = rows
                .iter()
                .filter(|r| r.category == *category)
                .filter_map(|r| r.deviation.map(f64::abs));
            quantile(magnitudes, 0.98).map(|limit| DeviationLimit {
                category: category.clone(),
                limit,
            })
        })
        .collect();
    limits.sort_by(|a, b| b.limit.total_cmp(&a.limit));
    limits
}
