//! Input table readers
//!
//! Every input is a headed CSV file. Columns are matched by header name, so
//! extra columns are ignored and column order does not matter. Cells are
//! trimmed before parsing.

use crate::error::AnalysisError;
use crate::types::{EthogramEntry, EventObservation, ScanObservation, SocialInteraction};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Row-level checks beyond what the column types enforce
pub trait ValidateRecord {
    fn validate(&self) -> Result<(), String>;
}

impl ValidateRecord for EthogramEntry {
    fn validate(&self) -> Result<(), String> {
        non_empty("Behavior", &self.behavior)
    }
}

impl ValidateRecord for ScanObservation {
    fn validate(&self) -> Result<(), String> {
        non_empty("Behavior", &self.behavior)
    }
}

impl ValidateRecord for EventObservation {
    fn validate(&self) -> Result<(), String> {
        non_empty("Behavior", &self.behavior)
    }
}

impl ValidateRecord for SocialInteraction {
    fn validate(&self) -> Result<(), String> {
        non_empty("Actor", &self.actor)?;
        non_empty("Target", &self.target)?;
        non_empty("Category", &self.category)
    }
}

fn non_empty(column: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{column} is empty"))
    } else {
        Ok(())
    }
}

/// Parse and validate every row of a CSV table. `source` names the table in
/// error messages.
pub fn read_table<T, R>(reader: R, source: &str) -> Result<Vec<T>, AnalysisError>
where
    T: DeserializeOwned + ValidateRecord,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv.deserialize::<T>() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            AnalysisError::InvalidRecord(format!("{source} line {line}: {e}"))
        })?;
        row.validate().map_err(|msg| {
            // header is line 1
            AnalysisError::InvalidRecord(format!("{source} line {}: {msg}", rows.len() + 2))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_path<T>(path: &Path) -> Result<Vec<T>, AnalysisError>
where
    T: DeserializeOwned + ValidateRecord,
{
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let rows = read_table(file, &path.display().to_string())?;
    info!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(rows)
}

pub fn read_ethogram(path: &Path) -> Result<Vec<EthogramEntry>, AnalysisError> {
    read_path(path)
}

pub fn read_scans(path: &Path) -> Result<Vec<ScanObservation>, AnalysisError> {
    read_path(path)
}

pub fn read_events(path: &Path) -> Result<Vec<EventObservation>, AnalysisError> {
    read_path(path)
}

pub fn read_interactions(path: &Path) -> Result<Vec<SocialInteraction>, AnalysisError> {
    read_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ethogram_extra_columns_and_empty_category() {
        let data = "Behavior,Category,Description\n Graze ,Comer,eats grass\nStare,,looks\n";
        let rows: Vec<EthogramEntry> = read_table(data.as_bytes(), "ethogram").unwrap();

        assert_eq!(
            rows,
            vec![
                EthogramEntry {
                    behavior: "Graze".to_string(),
                    category: Some("Comer".to_string()),
                },
                EthogramEntry {
                    behavior: "Stare".to_string(),
                    category: None,
                },
            ]
        );
    }

    #[test]
    fn test_scans_any_column_order() {
        let data = "Behavior,Count,Scan,Day\nGraze,3,2,1\n";
        let rows: Vec<ScanObservation> = read_table(data.as_bytes(), "scans").unwrap();
        assert_eq!(
            rows,
            vec![ScanObservation {
                day: 1,
                scan: 2,
                behavior: "Graze".to_string(),
                count: 3,
            }]
        );
    }

    #[test]
    fn test_malformed_count_rejected() {
        let data = "Day,Scan,Behavior,Count\n1,1,Graze,three\n";
        let err = read_table::<ScanObservation, _>(data.as_bytes(), "scans").unwrap_err();
        match err {
            AnalysisError::InvalidRecord(msg) => assert!(msg.starts_with("scans line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_count_rejected() {
        let data = "Event,Behavior,Count\n1,Graze,-1\n";
        let result = read_table::<EventObservation, _>(data.as_bytes(), "events");
        assert!(matches!(result, Err(AnalysisError::InvalidRecord(_))));
    }

    #[test]
    fn test_empty_actor_rejected() {
        let data = "Actor,Target,Category,Count\nN1,N2,Agonista,1\n ,N2,Agonista,1\n";
        let err = read_table::<SocialInteraction, _>(data.as_bytes(), "social").unwrap_err();
        match err {
            AnalysisError::InvalidRecord(msg) => assert_eq!(msg, "social line 3: Actor is empty"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_scans(Path::new("/nonexistent/ethoscan/scans.csv"));
        assert!(matches!(result, Err(AnalysisError::Io { .. })));
    }
}
