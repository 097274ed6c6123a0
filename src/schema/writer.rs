//! Output table writers
//!
//! Missing values (no baseline, no weight, no role) are written as empty cells.

use crate::anomaly::AlertList;
use crate::baseline::CategoryBaseline;
use crate::deviation::DeviationLimit;
use crate::error::AnalysisError;
use crate::proportions::ProportionTable;
use crate::types::{DeviationRow, DirectedEdge, EventKey, LedgerEntry, RoleAssignment, ScanKey};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish<W: Write>(mut csv: csv::Writer<W>) -> Result<(), AnalysisError> {
    csv.flush().map_err(|e| AnalysisError::Csv(e.into()))
}

/// `Category, Proportion`
pub fn write_baseline<W: Write>(writer: W, baseline: &CategoryBaseline) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    for entry in baseline.entries() {
        csv.serialize(entry)?;
    }
    finish(csv)
}

/// `Day, Scan, Category, Proportion`
pub fn write_scan_proportions<W: Write>(
    writer: W,
    table: &ProportionTable<ScanKey>,
) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Day", "Scan", "Category", "Proportion"])?;
    for row in table.rows() {
        csv.write_record([
            row.key.day.to_string(),
            row.key.scan.to_string(),
            row.category.clone(),
            row.proportion.to_string(),
        ])?;
    }
    finish(csv)
}

/// `Category, Limit`
pub fn write_deviation_limits<W: Write>(writer: W, limits: &[DeviationLimit]) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Category", "Limit"])?;
    for limit in limits {
        csv.write_record([limit.category.clone(), limit.limit.to_string()])?;
    }
    finish(csv)
}

/// Flagged scans in alert order
pub fn write_alerts<W: Write>(writer: W, alerts: &AlertList) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    if alerts.is_empty() {
        csv.write_record([
            "Day",
            "Scan",
            "Category",
            "Proportion",
            "Flag",
            "Severity",
            "Count",
            "Total",
            "SeverityRank",
        ])?;
    }
    for alert in alerts.iter() {
        csv.serialize(alert)?;
    }
    finish(csv)
}

/// `Event, Category, Proportion, Baseline_Proportion, Deviation`
pub fn write_event_deviations<W: Write>(
    writer: W,
    rows: &[DeviationRow<EventKey>],
) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Event", "Category", "Proportion", "Baseline_Proportion", "Deviation"])?;
    for row in rows {
        csv.write_record([
            row.key.to_string(),
            row.category.clone(),
            row.proportion.to_string(),
            cell(row.baseline),
            cell(row.deviation),
        ])?;
    }
    finish(csv)
}

const LEDGER_HEADER: [&str; 9] = [
    "Individual",
    "Category",
    "OUT",
    "IN",
    "NET",
    "WEIGHT",
    "W_NET",
    "TOTAL",
    "BIAS",
];

fn ledger_cells(entry: &LedgerEntry) -> Vec<String> {
    vec![
        entry.individual.clone(),
        entry.category.clone(),
        entry.out.to_string(),
        entry.inbound.to_string(),
        entry.net.to_string(),
        cell(entry.weight),
        cell(entry.w_net),
        entry.total.to_string(),
        entry.bias.to_string(),
    ]
}

pub fn write_ledger<W: Write>(writer: W, entries: &[LedgerEntry]) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(LEDGER_HEADER)?;
    for entry in entries {
        csv.write_record(ledger_cells(entry))?;
    }
    finish(csv)
}

/// Ledger columns followed by `Role, System`
pub fn write_roles<W: Write>(writer: W, assignments: &[RoleAssignment]) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(LEDGER_HEADER.iter().chain(&["Role", "System"]))?;
    for a in assignments {
        let mut cells = ledger_cells(&a.entry);
        cells.push(a.role.map(|r| r.as_str().to_string()).unwrap_or_default());
        cells.push(a.system.clone());
        csv.write_record(cells)?;
    }
    finish(csv)
}

/// `Source, Target, Category, Raw_Count, Weighted_Intensity`
pub fn write_edges<W: Write>(writer: W, edges: &[DirectedEdge]) -> Result<(), AnalysisError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Source", "Target", "Category", "Raw_Count", "Weighted_Intensity"])?;
    for edge in edges {
        csv.write_record([
            edge.source.clone(),
            edge.target.clone(),
            edge.category.clone(),
            edge.raw_count.to_string(),
            cell(edge.weighted_intensity),
        ])?;
    }
    finish(csv)
}

/// Create `path` (and its parent directories) and hand the file to `write`
pub fn write_file<F>(path: &Path, write: F) -> Result<(), AnalysisError>
where
    F: FnOnce(File) -> Result<(), AnalysisError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    write(file)?;
    debug!(path = %path.display(), "wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anomaly, BaselineEntry, ClassifiedRow, Flag, ProportionRow, Role, Severity};
    use pretty_assertions::assert_eq;

    fn text<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), AnalysisError>,
    {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_baseline_table() {
        let baseline = CategoryBaseline::from_entries(vec![
            BaselineEntry {
                category: "Comer".to_string(),
                proportion: 0.8,
            },
            BaselineEntry {
                category: "Descanso".to_string(),
                proportion: 0.2,
            },
        ]);
        let out = text(|w| write_baseline(w, &baseline));
        assert_eq!(out, "Category,Proportion\nComer,0.8\nDescanso,0.2\n");
    }

    #[test]
    fn test_alerts_table() {
        let alerts = AlertList::from_classified(&[ClassifiedRow {
            row: ProportionRow {
                key: ScanKey::new(3, 7),
                category: "Comer".to_string(),
                count: 10,
                total: 10,
                proportion: 1.0,
            },
            anomaly: Some(Anomaly::new(Flag::HighOutlier, Severity::High)),
        }]);
        let out = text(|w| write_alerts(w, &alerts));
        assert_eq!(
            out,
            "Day,Scan,Category,Proportion,Flag,Severity,Count,Total,SeverityRank\n\
             3,7,Comer,1.0,HIGH_OUTLIER,HIGH,10,10,0\n"
        );

        let empty = text(|w| write_alerts(w, &AlertList::default()));
        assert!(empty.starts_with("Day,Scan,Category"));
    }

    #[test]
    fn test_event_deviations_leave_missing_baseline_empty() {
        let rows = vec![DeviationRow {
            key: 4u32,
            category: "Vocalización".to_string(),
            proportion: 0.5,
            baseline: None,
            deviation: None,
        }];
        let out = text(|w| write_event_deviations(w, &rows));
        assert_eq!(
            out,
            "Event,Category,Proportion,Baseline_Proportion,Deviation\n4,Vocalización,0.5,,\n"
        );
    }

    #[test]
    fn test_roles_table() {
        let assignment = RoleAssignment {
            entry: LedgerEntry {
                individual: "N1".to_string(),
                category: "Agonista".to_string(),
                out: 5,
                inbound: 1,
                net: 4,
                weight: Some(2.0),
                w_net: Some(8.0),
                total: 6,
                bias: 0.5,
            },
            role: Some(Role::PrimaryActor),
            system: "Agonista".to_string(),
        };
        let out = text(|w| write_roles(w, &[assignment]));
        assert_eq!(
            out,
            "Individual,Category,OUT,IN,NET,WEIGHT,W_NET,TOTAL,BIAS,Role,System\n\
             N1,Agonista,5,1,4,2,8,6,0.5,Primary_Actor,Agonista\n"
        );
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = std::env::temp_dir().join(format!("ethoscan-writer-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested dir").join("limits.csv");
        let limits = vec![DeviationLimit {
            category: "Comer".to_string(),
            limit: 0.25,
        }];

        write_file(&path, |f| write_deviation_limits(f, &limits)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Category,Limit\nComer,0.25\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}
