//! Core types for the ethoscan pipeline
//!
//! This module defines the records read from observation files and the rows that
//! flow through each stage: categorized records, baseline entries, proportion
//! rows, deviation rows, anomaly classifications, and social ledger rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group key for scan samples: one instantaneous scan on one observation day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanKey {
    pub day: u32,
    pub scan: u32,
}

impl ScanKey {
    pub fn new(day: u32, scan: u32) -> Self {
        Self { day, scan }
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {} Scan {}", self.day, self.scan)
    }
}

/// Group key for focal-individual observations: the event sequence number
pub type EventKey = u32;

/// A raw observation that can be grouped and mapped through the ethogram
pub trait Observation {
    type Key: Ord + Clone;

    /// Grouping key (day+scan, or event)
    fn group_key(&self) -> Self::Key;
    /// Raw behavior label as recorded
    fn behavior(&self) -> &str;
    /// Number of individuals (or occurrences) observed doing the behavior
    fn count(&self) -> u64;
}

/// One row of `group_scan_observations.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanObservation {
    #[serde(rename = "Day")]
    pub day: u32,
    #[serde(rename = "Scan")]
    pub scan: u32,
    #[serde(rename = "Behavior")]
    pub behavior: String,
    #[serde(rename = "Count")]
    pub count: u64,
}

impl Observation for ScanObservation {
    type Key = ScanKey;

    fn group_key(&self) -> ScanKey {
        ScanKey::new(self.day, self.scan)
    }

    fn behavior(&self) -> &str {
        &self.behavior
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// One row of a focal-individual file (e.g. `N2_individual_observation.csv`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventObservation {
    #[serde(rename = "Event")]
    pub event: u32,
    #[serde(rename = "Behavior")]
    pub behavior: String,
    #[serde(rename = "Count")]
    pub count: u64,
}

impl Observation for EventObservation {
    type Key = EventKey;

    fn group_key(&self) -> EventKey {
        self.event
    }

    fn behavior(&self) -> &str {
        &self.behavior
    }

    fn count(&self) -> u64 {
        self.count
    }
}

/// One row of `ethogram_reference.csv`. Extra columns in the file are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthogramEntry {
    #[serde(rename = "Behavior")]
    pub behavior: String,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
}

/// One row of `directed_social_interactions.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialInteraction {
    #[serde(rename = "Actor")]
    pub actor: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    pub count: u64,
}

/// An observation after the ethogram join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedRecord<K> {
    pub key: K,
    /// Trimmed behavior label
    pub behavior: String,
    pub category: String,
    pub count: u64,
}

/// Global proportion of one category across the whole scan dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Proportion")]
    pub proportion: f64,
}

/// Share of one category within one group (scan or event)
#[derive(Debug, Clone, PartialEq)]
pub struct ProportionRow<K> {
    pub key: K,
    pub category: String,
    /// Summed count of the category within the group (0 when zero-filled)
    pub count: u64,
    /// Summed count of all categories within the group
    pub total: u64,
    pub proportion: f64,
}

/// A proportion row joined against the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRow<K> {
    pub key: K,
    pub category: String,
    pub proportion: f64,
    /// Baseline proportion, `None` when the category is absent from the baseline
    pub baseline: Option<f64>,
    /// `proportion - baseline`
    pub deviation: Option<f64>,
}

/// Direction of an anomalous proportion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    HighOutlier,
    LowOutlier,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::HighOutlier => "HIGH_OUTLIER",
            Flag::LowOutlier => "LOW_OUTLIER",
        }
    }
}

/// Severity tier of an anomaly (p99/p01, p98/p02, p95/p05)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Display rank: HIGH first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

/// A flagged proportion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anomaly {
    pub flag: Flag,
    pub severity: Severity,
}

impl Anomaly {
    pub fn new(flag: Flag, severity: Severity) -> Self {
        Self { flag, severity }
    }
}

/// A proportion row with its anomaly classification (`None` = not anomalous)
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow<K> {
    pub row: ProportionRow<K>,
    pub anomaly: Option<Anomaly>,
}

/// Social role of an individual within one interaction system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Isolated,
    #[serde(rename = "Primary_Actor")]
    PrimaryActor,
    #[serde(rename = "Secondary_Actor")]
    SecondaryActor,
    #[serde(rename = "Primary_Receiver")]
    PrimaryReceiver,
    Peripheral,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Isolated => "Isolated",
            Role::PrimaryActor => "Primary_Actor",
            Role::SecondaryActor => "Secondary_Actor",
            Role::PrimaryReceiver => "Primary_Receiver",
            Role::Peripheral => "Peripheral",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed interaction tallies of one individual in one social category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    #[serde(rename = "Individual")]
    pub individual: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "OUT")]
    pub out: u64,
    #[serde(rename = "IN")]
    pub inbound: u64,
    #[serde(rename = "NET")]
    pub net: i64,
    /// Rarity weight, `None` when the category has no usable global proportion
    #[serde(rename = "WEIGHT")]
    pub weight: Option<f64>,
    #[serde(rename = "W_NET")]
    pub w_net: Option<f64>,
    #[serde(rename = "TOTAL")]
    pub total: u64,
    /// NET / TOTAL, 0 when TOTAL is 0
    #[serde(rename = "BIAS")]
    pub bias: f64,
}

/// A ledger entry with its assigned role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleAssignment {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    #[serde(rename = "Role")]
    pub role: Option<Role>,
    /// Interaction system the role was computed within
    #[serde(rename = "System")]
    pub system: String,
}

/// One directed interaction record, weighted by category rarity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectedEdge {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Raw_Count")]
    pub raw_count: u64,
    #[serde(rename = "Weighted_Intensity")]
    pub weighted_intensity: Option<f64>,
}
