//! Terminal tables

use crate::anomaly::AlertList;
use crate::baseline::CategoryBaseline;
use crate::deviation::DeviationLimit;
use crate::translate::LabelTranslator;
use crate::types::RoleAssignment;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
}

fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

/// Baseline in descending proportion order
pub fn baseline_table(baseline: &CategoryBaseline, translator: &LabelTranslator) -> String {
    let mut out = String::new();
    heading(&mut out, "CATEGORY BASELINE");
    let _ = writeln!(out, "{:<28} {:>10}", "Category", "Proportion");
    for entry in baseline.entries() {
        let _ = writeln!(
            out,
            "{:<28} {:>10.4}",
            translator.category(&entry.category),
            entry.proportion
        );
    }
    out
}

/// Flagged scans in alert order
pub fn flags_table(alerts: &AlertList, translator: &LabelTranslator) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("SCAN ANOMALIES ({})", alerts.len()));
    let _ = writeln!(
        out,
        "{:>4} {:>5} {:<22} {:>10} {:<13} {:<8}",
        "Day", "Scan", "Category", "Proportion", "Flag", "Severity"
    );
    for alert in alerts.iter() {
        let _ = writeln!(
            out,
            "{:>4} {:>5} {:<22} {:>10.3} {:<13} {:<8}",
            alert.day,
            alert.scan,
            translator.category(&alert.category),
            alert.proportion,
            alert.flag.as_str(),
            alert.severity.as_str()
        );
    }
    out
}

/// One table per interaction system, strongest actors first
pub fn roles_table(assignments: &[RoleAssignment], systems: &[String], translator: &LabelTranslator) -> String {
    let mut out = String::new();
    for system in systems {
        let mut rows: Vec<&RoleAssignment> = assignments.iter().filter(|a| a.system == *system).collect();
        rows.sort_by(|a, b| {
            let wa = a.entry.w_net.unwrap_or(f64::NEG_INFINITY);
            let wb = b.entry.w_net.unwrap_or(f64::NEG_INFINITY);
            wb.total_cmp(&wa)
        });

        let _ = writeln!(out);
        heading(
            &mut out,
            &format!("ROLES TABLE - {}", translator.category(system).to_uppercase()),
        );
        let _ = writeln!(
            out,
            "{:<10} {:>5} {:>5} {:>5} {:>10} {:>6} {:>7}  {}",
            "Individual", "OUT", "IN", "NET", "W_NET", "TOTAL", "BIAS", "Role"
        );
        for a in rows {
            let e = &a.entry;
            let _ = writeln!(
                out,
                "{:<10} {:>5} {:>5} {:>5} {:>10} {:>6} {:>7.3}  {}",
                e.individual,
                e.out,
                e.inbound,
                e.net,
                opt(e.w_net, 2),
                e.total,
                e.bias,
                a.role.map(|r| r.as_str()).unwrap_or("-")
            );
        }
    }
    out
}

/// Per-category deviation limits, largest first
pub fn limits_table(limits: &[DeviationLimit], translator: &LabelTranslator) -> String {
    let mut out = String::new();
    heading(&mut out, "DEVIATION LIMITS (P98 |deviation|)");
    for limit in limits {
        let _ = writeln!(
            out,
            "{:<28} {:>8.3}",
            translator.category(&limit.category),
            limit.limit
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaselineEntry, LedgerEntry, Role};

    #[test]
    fn test_baseline_table_translates() {
        let baseline = CategoryBaseline::from_entries(vec![
            BaselineEntry {
                category: "Comer".to_string(),
                proportion: 0.75,
            },
            BaselineEntry {
                category: "Descanso".to_string(),
                proportion: 0.25,
            },
        ]);
        let translator = LabelTranslator::new(&crate::config::TranslationConfig::default());
        let text = baseline_table(&baseline, &translator);

        assert!(text.contains("Feeding"));
        assert!(text.contains("0.7500"));
        assert!(text.find("Feeding") < text.find("Resting"));
    }

    #[test]
    fn test_roles_table_orders_by_w_net() {
        let assignment = |individual: &str, w_net: Option<f64>, role: Option<Role>| RoleAssignment {
            entry: LedgerEntry {
                individual: individual.to_string(),
                category: "Agonista".to_string(),
                out: 1,
                inbound: 1,
                net: 0,
                weight: w_net.map(|_| 1.0),
                w_net,
                total: 2,
                bias: 0.0,
            },
            role,
            system: "Agonista".to_string(),
        };
        let assignments = vec![
            assignment("N1", Some(-3.0), Some(Role::PrimaryReceiver)),
            assignment("N2", Some(5.0), Some(Role::PrimaryActor)),
        ];
        let text = roles_table(
            &assignments,
            &["Agonista".to_string()],
            &LabelTranslator::new(&crate::config::TranslationConfig::default()),
        );

        assert!(text.contains("ROLES TABLE - AGONISTIC"));
        assert!(text.find("N2") < text.find("N1"));
        assert!(text.contains("Primary_Actor"));
    }

    #[test]
    fn test_missing_values_render_as_dash() {
        assert_eq!(opt(None, 2), "-");
        assert_eq!(opt(Some(1.23456), 2), "1.23");
    }
}
