//! Alert exploration
//!
//! [`drill_down`] answers "which behaviors made up this anomalous proportion?"
//! for one alert. [`ExploreSession`] wraps it in a line-oriented loop over any
//! reader and writer, so the terminal version and the tests share one code path.

use crate::anomaly::{Alert, AlertList};
use crate::baseline::ratio;
use crate::error::AnalysisError;
use crate::translate::LabelTranslator;
use crate::types::{CategorizedRecord, ScanKey};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// One behavior within a drill-down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillRow {
    pub behavior: String,
    pub count: u64,
    /// Share of the drill-down total
    pub proportion: f64,
}

/// Behaviors behind one alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDown {
    pub key: ScanKey,
    pub category: String,
    pub rows: Vec<DrillRow>,
    pub total: u64,
}

/// Behaviors recorded in the alert's scan and category, summed per behavior,
/// largest count first (ties by behavior label)
pub fn drill_down(alert: &Alert, records: &[CategorizedRecord<ScanKey>]) -> DrillDown {
    let key = alert.key();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for record in records
        .iter()
        .filter(|r| r.key == key && r.category == alert.category)
    {
        *counts.entry(record.behavior.as_str()).or_insert(0) += record.count;
    }

    let total: u64 = counts.values().sum();
    let mut rows: Vec<DrillRow> = counts
        .into_iter()
        .map(|(behavior, count)| DrillRow {
            behavior: behavior.to_string(),
            count,
            proportion: ratio(count, total),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.behavior.cmp(&b.behavior)));

    DrillDown {
        key,
        category: alert.category.clone(),
        rows,
        total,
    }
}

/// Interactive alert browser
pub struct ExploreSession<'a> {
    alerts: &'a AlertList,
    records: &'a [CategorizedRecord<ScanKey>],
    translator: &'a LabelTranslator,
}

impl<'a> ExploreSession<'a> {
    pub fn new(
        alerts: &'a AlertList,
        records: &'a [CategorizedRecord<ScanKey>],
        translator: &'a LabelTranslator,
    ) -> Self {
        Self {
            alerts,
            records,
            translator,
        }
    }

    /// Run until an empty selection or end of input. Returns the number of
    /// alerts inspected.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<usize, AnalysisError> {
        let mut inspected = 0;

        loop {
            self.show_alerts(&mut output).map_err(AnalysisError::Terminal)?;
            write!(output, "\nSelect alert number to inspect (Enter to exit): ")
                .and_then(|_| output.flush())
                .map_err(AnalysisError::Terminal)?;

            let Some(choice) = read_line(&mut input)? else {
                break;
            };
            if choice.is_empty() {
                break;
            }

            let alert = match choice.parse::<usize>() {
                Ok(index) => self.alerts.get(index),
                Err(_) => Err(AnalysisError::InvalidSelection(choice.clone())),
            };
            let alert = match alert {
                Ok(alert) => alert,
                Err(err) => {
                    writeln!(output, "\nInvalid selection: {err}").map_err(AnalysisError::Terminal)?;
                    continue;
                }
            };

            let drill = drill_down(alert, self.records);
            self.show_drill_down(alert, &drill, &mut output)
                .map_err(AnalysisError::Terminal)?;
            inspected += 1;

            write!(output, "\nPress Enter to return to alert list...")
                .and_then(|_| output.flush())
                .map_err(AnalysisError::Terminal)?;
            if read_line(&mut input)?.is_none() {
                break;
            }
        }

        writeln!(output, "\nExiting explorer.").map_err(AnalysisError::Terminal)?;
        Ok(inspected)
    }

    fn show_alerts<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "\n=== Anomaly Alerts ===")?;
        if self.alerts.is_empty() {
            writeln!(out, "\nNo anomalies flagged.")?;
            return Ok(());
        }

        let mut last_day = None;
        for (i, alert) in self.alerts.iter().enumerate() {
            if last_day != Some(alert.day) {
                writeln!(out, "\n--- Day {} {}", alert.day, "-".repeat(48))?;
                last_day = Some(alert.day);
            }
            writeln!(
                out,
                "{:>3} | Severity: {:<6} | Scan {:<3} | {:<16} | {}",
                i + 1,
                alert.severity.as_str(),
                alert.scan,
                self.translator.category(&alert.category),
                alert.flag.as_str()
            )?;
        }
        Ok(())
    }

    fn show_drill_down<W: Write>(&self, alert: &Alert, drill: &DrillDown, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "\n=== Alert Investigation ===")?;
        writeln!(out, "Severity: {}", alert.severity.as_str())?;
        writeln!(
            out,
            "Day {} | Scan {} | Category: {}\n",
            alert.day,
            alert.scan,
            self.translator.category(&alert.category)
        )?;

        writeln!(out, "{:<28} {:>6} {:>10}", "Behavior", "Count", "Proportion")?;
        for row in &drill.rows {
            writeln!(
                out,
                "{:<28} {:>6} {:>10.3}",
                self.translator.behavior(&row.behavior),
                row.count,
                row.proportion
            )?;
        }
        Ok(())
    }
}

/// Next trimmed line, `None` at end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, AnalysisError> {
    let mut line = String::new();
    let read = input.read_line(&mut line).map_err(AnalysisError::Terminal)?;
    if read == 0 {
        Ok(None)
    } else {
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anomaly, ClassifiedRow, Flag, ProportionRow, Severity};
    use pretty_assertions::assert_eq;

    fn record(day: u32, scan: u32, behavior: &str, category: &str, count: u64) -> CategorizedRecord<ScanKey> {
        CategorizedRecord {
            key: ScanKey::new(day, scan),
            behavior: behavior.to_string(),
            category: category.to_string(),
            count,
        }
    }

    fn records() -> Vec<CategorizedRecord<ScanKey>> {
        vec![
            record(1, 3, "Graze", "Comer", 2),
            record(1, 3, "Chew", "Comer", 5),
            record(1, 3, "Graze", "Comer", 3),
            record(1, 3, "Sleep", "Descanso", 4),
            record(1, 4, "Graze", "Comer", 9),
        ]
    }

    fn alerts() -> AlertList {
        let row = |day, scan, category: &str, severity| ClassifiedRow {
            row: ProportionRow {
                key: ScanKey::new(day, scan),
                category: category.to_string(),
                count: 10,
                total: 14,
                proportion: 10.0 / 14.0,
            },
            anomaly: Some(Anomaly::new(Flag::HighOutlier, severity)),
        };
        AlertList::from_classified(&[
            row(1, 3, "Comer", Severity::High),
            row(2, 7, "Descanso", Severity::Low),
        ])
    }

    #[test]
    fn test_drill_down_sums_and_sorts() {
        let alerts = alerts();
        let drill = drill_down(alerts.get(1).unwrap(), &records());

        assert_eq!(drill.total, 10);
        let rows: Vec<(&str, u64)> = drill.rows.iter().map(|r| (r.behavior.as_str(), r.count)).collect();
        assert_eq!(rows, vec![("Chew", 5), ("Graze", 5)]);
        assert!((drill.rows[0].proportion - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_drill_down_without_records() {
        let alerts = alerts();
        let drill = drill_down(alerts.get(2).unwrap(), &records());
        assert_eq!(drill.total, 0);
        assert!(drill.rows.is_empty());
    }

    #[test]
    fn test_session_transcript() {
        let alerts = alerts();
        let records = records();
        let translator = LabelTranslator::new(&crate::config::TranslationConfig::default());
        let session = ExploreSession::new(&alerts, &records, &translator);

        let mut out = Vec::new();
        let inspected = session.run("9\nabc\n1\n\n\n".as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(inspected, 1);
        assert_eq!(text.matches("=== Anomaly Alerts ===").count(), 4);
        assert!(text.contains("--- Day 1"));
        assert!(text.contains("--- Day 2"));
        assert!(text.contains("Invalid selection: Alert 9 out of range (1..=2)"));
        assert!(text.contains("Invalid selection: \"abc\" is not an alert number"));
        assert!(!text.contains("Invalid record"));
        assert!(text.contains("=== Alert Investigation ==="));
        assert!(text.contains("Category: Feeding"));
        assert!(text.trim_end().ends_with("Exiting explorer."));
    }

    #[test]
    fn test_session_exits_on_eof() {
        let alerts = AlertList::default();
        let translator = LabelTranslator::identity();
        let session = ExploreSession::new(&alerts, &[], &translator);

        let mut out = Vec::new();
        let inspected = session.run("".as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(inspected, 0);
        assert!(text.contains("No anomalies flagged."));
        assert!(text.contains("Exiting explorer."));
    }
}
