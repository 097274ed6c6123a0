//! Scan anomaly flagging
//!
//! Each category gets six empirical quantile thresholds (p01, p02, p05, p95,
//! p98, p99) computed over all of its scan proportions. A proportion is then
//! classified against its own category's thresholds, most extreme tier first.
//! All comparisons are strict: a value equal to a threshold is not flagged at
//! that tier.

use crate::error::AnalysisError;
use crate::proportions::ProportionTable;
use crate::quantile::Quantiles;
use crate::types::{Anomaly, ClassifiedRow, Flag, ScanKey, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Quantile levels backing the three severity tiers, low side then high side
pub const THRESHOLD_LEVELS: [f64; 6] = [0.01, 0.02, 0.05, 0.95, 0.98, 0.99];

/// Quantile thresholds of one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub p01: f64,
    pub p02: f64,
    pub p05: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
}

impl CategoryThresholds {
    /// Thresholds from a category's proportions; `None` when there are none
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let q = Quantiles::new(values, &THRESHOLD_LEVELS);
        Some(Self {
            p01: q.get(0.01)?,
            p02: q.get(0.02)?,
            p05: q.get(0.05)?,
            p95: q.get(0.95)?,
            p98: q.get(0.98)?,
            p99: q.get(0.99)?,
        })
    }

    /// Classify a proportion, most extreme tier first
    pub fn classify(&self, value: f64) -> Option<Anomaly> {
        let tiers = [
            (self.p99, self.p01, Severity::High),
            (self.p98, self.p02, Severity::Medium),
            (self.p95, self.p05, Severity::Low),
        ];

        for (high, low, severity) in tiers {
            if value > high {
                return Some(Anomaly::new(Flag::HighOutlier, severity));
            }
            if value < low {
                return Some(Anomaly::new(Flag::LowOutlier, severity));
            }
        }
        None
    }
}

/// Thresholds for every category of a proportion table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    by_category: BTreeMap<String, CategoryThresholds>,
}

impl ThresholdTable {
    /// Pool all groups per category and compute the thresholds
    pub fn build<K: Ord + Clone>(table: &ProportionTable<K>) -> Self {
        let by_category = table
            .categories()
            .iter()
            .filter_map(|category| {
                CategoryThresholds::from_values(table.category_values(category))
                    .map(|t| (category.clone(), t))
            })
            .collect();
        Self { by_category }
    }

    pub fn get(&self, category: &str) -> Option<&CategoryThresholds> {
        self.by_category.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryThresholds)> {
        self.by_category.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}

/// Classifies proportions against per-category thresholds
#[derive(Debug, Clone)]
pub struct AnomalyFlagger {
    thresholds: ThresholdTable,
}

impl AnomalyFlagger {
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self { thresholds }
    }

    /// Thresholds computed from the table that will be classified
    pub fn from_table<K: Ord + Clone>(table: &ProportionTable<K>) -> Self {
        Self::new(ThresholdTable::build(table))
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// `None` when the value is unremarkable or the category has no thresholds
    pub fn classify(&self, category: &str, value: f64) -> Option<Anomaly> {
        self.thresholds.get(category)?.classify(value)
    }

    /// Classification of every row, unflagged rows included
    pub fn classify_all<K: Clone>(&self, table: &ProportionTable<K>) -> Vec<ClassifiedRow<K>> {
        let classified: Vec<ClassifiedRow<K>> = table
            .rows()
            .iter()
            .map(|row| ClassifiedRow {
                anomaly: self.classify(&row.category, row.proportion),
                row: row.clone(),
            })
            .collect();

        info!(
            rows = classified.len(),
            flagged = classified.iter().filter(|r| r.anomaly.is_some()).count(),
            "classified scan proportions"
        );
        classified
    }
}

/// Keep only flagged rows
pub fn flagged<K: Clone>(rows: &[ClassifiedRow<K>]) -> Vec<ClassifiedRow<K>> {
    rows.iter().filter(|r| r.anomaly.is_some()).cloned().collect()
}

/// A flagged scan proportion, as persisted and shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "Day")]
    pub day: u32,
    #[serde(rename = "Scan")]
    pub scan: u32,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Proportion")]
    pub proportion: f64,
    #[serde(rename = "Flag")]
    pub flag: Flag,
    #[serde(rename = "Severity")]
    pub severity: Severity,
    #[serde(rename = "Count")]
    pub count: u64,
    #[serde(rename = "Total")]
    pub total: u64,
    #[serde(rename = "SeverityRank")]
    pub severity_rank: u8,
}

impl Alert {
    /// `None` for rows that were not flagged
    pub fn from_row(row: &ClassifiedRow<ScanKey>) -> Option<Self> {
        let anomaly = row.anomaly?;
        Some(Self {
            day: row.row.key.day,
            scan: row.row.key.scan,
            category: row.row.category.clone(),
            proportion: row.row.proportion,
            flag: anomaly.flag,
            severity: anomaly.severity,
            count: row.row.count,
            total: row.row.total,
            severity_rank: anomaly.severity.rank(),
        })
    }

    pub fn key(&self) -> ScanKey {
        ScanKey::new(self.day, self.scan)
    }
}

/// Alerts ordered by severity rank, then day, then scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertList {
    alerts: Vec<Alert>,
}

impl AlertList {
    /// Collect the flagged rows of a classification
    pub fn from_classified(rows: &[ClassifiedRow<ScanKey>]) -> Self {
        Self::new(rows.iter().filter_map(Alert::from_row).collect())
    }

    pub fn new(mut alerts: Vec<Alert>) -> Self {
        // stable: alerts of the same scan keep category order
        alerts.sort_by_key(|a| (a.severity_rank, a.day, a.scan));
        Self { alerts }
    }

    /// 1-based selection, as shown in the alert listing
    pub fn get(&self, index: usize) -> Result<&Alert, AnalysisError> {
        index
            .checked_sub(1)
            .and_then(|i| self.alerts.get(i))
            .ok_or(AnalysisError::AlertOutOfRange {
                index,
                len: self.alerts.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn as_slice(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategorizedRecord, ScanKey};
    use pretty_assertions::assert_eq;

    fn thresholds() -> CategoryThresholds {
        CategoryThresholds {
            p01: 0.01,
            p02: 0.02,
            p05: 0.05,
            p95: 0.95,
            p98: 0.98,
            p99: 0.99,
        }
    }

    #[test]
    fn test_tiers_most_extreme_first() {
        let t = thresholds();
        assert_eq!(t.classify(0.995), Some(Anomaly::new(Flag::HighOutlier, Severity::High)));
        assert_eq!(t.classify(0.985), Some(Anomaly::new(Flag::HighOutlier, Severity::Medium)));
        assert_eq!(t.classify(0.96), Some(Anomaly::new(Flag::HighOutlier, Severity::Low)));
        assert_eq!(t.classify(0.005), Some(Anomaly::new(Flag::LowOutlier, Severity::High)));
        assert_eq!(t.classify(0.015), Some(Anomaly::new(Flag::LowOutlier, Severity::Medium)));
        assert_eq!(t.classify(0.03), Some(Anomaly::new(Flag::LowOutlier, Severity::Low)));
        assert_eq!(t.classify(0.5), None);
    }

    #[test]
    fn test_threshold_equality_is_not_flagged_at_that_tier() {
        let t = thresholds();
        assert_eq!(t.classify(0.95), None);
        assert_eq!(t.classify(0.05), None);
        // equal to p99 falls through to the MEDIUM tier
        assert_eq!(t.classify(0.99), Some(Anomaly::new(Flag::HighOutlier, Severity::Medium)));
        assert_eq!(t.classify(0.01), Some(Anomaly::new(Flag::LowOutlier, Severity::Medium)));
    }

    #[test]
    fn test_high_severity_is_monotonic() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let t = CategoryThresholds::from_values(values.iter().copied()).unwrap();

        let mut seen_high = false;
        for v in values {
            let is_high = t.classify(v) == Some(Anomaly::new(Flag::HighOutlier, Severity::High));
            if seen_high {
                assert!(is_high, "{v} should stay HIGH_OUTLIER/HIGH");
            }
            seen_high |= is_high;
        }
        assert!(seen_high);
    }

    #[test]
    fn test_empty_values_give_no_thresholds() {
        assert_eq!(CategoryThresholds::from_values(Vec::new()), None);
    }

    #[test]
    fn test_unknown_category_not_classified() {
        let flagger = AnomalyFlagger::new(ThresholdTable::default());
        assert_eq!(flagger.classify("Feeding", 1.0), None);
    }

    #[test]
    fn test_classify_table_flags_single_spike() {
        // 100 scans with 1 of 10 animals feeding, one scan with all 10 feeding
        let mut records = Vec::new();
        for scan in 1..=100u32 {
            records.push(CategorizedRecord {
                key: ScanKey::new(1, scan),
                behavior: "Graze".to_string(),
                category: "Feeding".to_string(),
                count: 1,
            });
            records.push(CategorizedRecord {
                key: ScanKey::new(1, scan),
                behavior: "Sleep".to_string(),
                category: "Resting".to_string(),
                count: 9,
            });
        }
        records.push(CategorizedRecord {
            key: ScanKey::new(2, 1),
            behavior: "Graze".to_string(),
            category: "Feeding".to_string(),
            count: 10,
        });

        let categories = vec!["Feeding".to_string(), "Resting".to_string()];
        let table = ProportionTable::build(&records, &categories);
        let flagger = AnomalyFlagger::from_table(&table);
        assert_eq!(flagger.thresholds().len(), 2);

        let classified = flagger.classify_all(&table);
        assert_eq!(classified.len(), table.len());

        let flags = flagged(&classified);
        assert_eq!(flags.len(), 2);
        assert!(flags.iter().all(|r| r.row.key == ScanKey::new(2, 1)));

        let feeding = flags.iter().find(|r| r.row.category == "Feeding").unwrap();
        assert_eq!(
            feeding.anomaly,
            Some(Anomaly::new(Flag::HighOutlier, Severity::High))
        );
        let resting = flags.iter().find(|r| r.row.category == "Resting").unwrap();
        assert_eq!(
            resting.anomaly,
            Some(Anomaly::new(Flag::LowOutlier, Severity::High))
        );
    }

    fn alert_row(day: u32, scan: u32, category: &str, severity: Severity) -> ClassifiedRow<ScanKey> {
        ClassifiedRow {
            row: crate::types::ProportionRow {
                key: ScanKey::new(day, scan),
                category: category.to_string(),
                count: 1,
                total: 10,
                proportion: 0.1,
            },
            anomaly: Some(Anomaly::new(Flag::HighOutlier, severity)),
        }
    }

    #[test]
    fn test_alert_order_severity_day_scan() {
        let mut rows = vec![
            alert_row(2, 1, "Feeding", Severity::Low),
            alert_row(3, 4, "Feeding", Severity::High),
            alert_row(1, 9, "Resting", Severity::Medium),
            alert_row(1, 2, "Feeding", Severity::High),
            alert_row(1, 2, "Resting", Severity::High),
        ];
        rows.push(ClassifiedRow {
            anomaly: None,
            ..alert_row(1, 1, "Feeding", Severity::High)
        });

        let alerts = AlertList::from_classified(&rows);
        let order: Vec<(u32, u32, &str)> = alerts
            .iter()
            .map(|a| (a.day, a.scan, a.category.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 2, "Feeding"),
                (1, 2, "Resting"),
                (3, 4, "Feeding"),
                (1, 9, "Resting"),
                (2, 1, "Feeding"),
            ]
        );
        assert_eq!(alerts.get(1).unwrap().severity_rank, 0);
        assert_eq!(alerts.get(5).unwrap().severity, Severity::Low);
    }

    #[test]
    fn test_alert_selection_out_of_range() {
        let alerts = AlertList::from_classified(&[alert_row(1, 1, "Feeding", Severity::Low)]);
        assert!(matches!(
            alerts.get(0),
            Err(AnalysisError::AlertOutOfRange { index: 0, len: 1 })
        ));
        assert!(matches!(
            alerts.get(2),
            Err(AnalysisError::AlertOutOfRange { index: 2, len: 1 })
        ));
    }
}
