//! Pipeline configuration
//!
//! Everything that was a module-level constant in the field scripts (roster,
//! social categories, rarity proportions, translations, plot styling) lives in
//! one immutable [`PipelineConfig`], loaded once and passed by reference.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do with observations whose behavior is missing from the ethogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Remove unmapped records before aggregation
    Drop,
    /// Count unmapped records into the unclassified category
    #[default]
    Unclassified,
    /// Abort the run
    Fail,
}

impl UnmappedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmappedPolicy::Drop => "drop",
            UnmappedPolicy::Unclassified => "unclassified",
            UnmappedPolicy::Fail => "fail",
        }
    }
}

/// Root directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub outputs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            outputs_dir: PathBuf::from("outputs"),
        }
    }
}

/// A focal-individual observation file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocalSource {
    /// Short name used in output file names and plot titles (e.g. "N2")
    pub name: String,
    /// File name relative to the data directory
    pub file: String,
}

/// Input file names, relative to `paths.data_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub ethogram: String,
    pub group_scans: String,
    pub focal: Vec<FocalSource>,
    pub social: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            ethogram: "ethogram_reference.csv".to_string(),
            group_scans: "group_scan_observations.csv".to_string(),
            focal: vec![FocalSource {
                name: "N2".to_string(),
                file: "N2_individual_observation.csv".to_string(),
            }],
            social: "directed_social_interactions.csv".to_string(),
        }
    }
}

/// Social ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Recognized interaction systems, in display order
    pub categories: Vec<String>,
    /// Named individuals; every ledger covers all of them
    pub roster: Vec<String>,
    /// Pinned global proportions used for rarity weights. When absent (`null`)
    /// the weights come from the baseline computed in the same run.
    pub category_proportions: Option<BTreeMap<String, f64>>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                "Agonista".to_string(),
                "Apaciguamiento".to_string(),
                "Afiliativa".to_string(),
            ],
            roster: (1..=8).map(|i| format!("N{i}")).collect(),
            // shares of the three systems in the reference scan dataset
            category_proportions: Some(
                [
                    ("Agonista", 0.004123711340206186),
                    ("Apaciguamiento", 0.006185567010309278),
                    ("Afiliativa", 0.016494845360824743),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ),
        }
    }
}

/// Display translations (never used for joins)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub categories: BTreeMap<String, String>,
    pub behaviors: BTreeMap<String, String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        let categories = [
            ("Comer", "Feeding"),
            ("Beber", "Drinking"),
            ("Descanso", "Resting"),
            ("Rumiación", "Rumination"),
            ("Locomoción", "Locomotion"),
            ("Exploración", "Exploration"),
            ("Cuidado corporal", "Body maintenance"),
            ("Agonista", "Agonistic"),
            ("Apaciguamiento", "Appeasement"),
            ("Afiliativa", "Affiliative"),
            ("Respuesta a coerción", "Response to coercion"),
            ("Autorregulación", "Self-regulation"),
            ("Locomoción cola", "Tail movement"),
            ("Locomoción orejas", "Ears movement"),
            ("Eliminación", "Micturition"),
            ("Otras generales", "Others"),
            ("Vocalización", "Vocalization"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            categories,
            behaviors: BTreeMap::new(),
        }
    }
}

/// Vertical annotation between two heatmap columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMarker {
    /// Position on the event axis (e.g. 3.5 sits between events 3 and 4)
    pub position: f64,
    pub label: String,
}

/// Deviation heatmap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub vmin: f64,
    pub vmax: f64,
    pub color_map: String,
    /// Markers drawn on focal-event heatmaps
    pub event_markers: Vec<EventMarker>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        let event_markers = [
            (3.5, "Students enter"),
            (4.5, "Restrained"),
            (5.5, "Invasive procedure"),
            (11.5, "Released"),
            (13.5, "Redirected agonism"),
        ]
        .into_iter()
        .map(|(position, label)| EventMarker {
            position,
            label: label.to_string(),
        })
        .collect();

        Self {
            vmin: -0.40,
            vmax: 0.40,
            color_map: "coolwarm".to_string(),
            event_markers,
        }
    }
}

/// Y-axis limit and line color for one category's variability band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandStyle {
    pub limit: f64,
    pub color: String,
}

/// Variability band settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub default_style: BandStyle,
    pub categories: BTreeMap<String, BandStyle>,
    /// Points beyond this fraction of the limit are annotated
    pub annotate_fraction: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        let categories = [
            ("Rumiación", 0.30, "#1f77b4"),
            ("Comer", 0.75, "#d62728"),
            ("Afiliativa", 0.15, "#2ca02c"),
        ]
        .into_iter()
        .map(|(cat, limit, color)| {
            (
                cat.to_string(),
                BandStyle {
                    limit,
                    color: color.to_string(),
                },
            )
        })
        .collect();

        Self {
            default_style: BandStyle {
                limit: 0.30,
                color: "#1f77b4".to_string(),
            },
            categories,
            annotate_fraction: 0.7,
        }
    }
}

impl BandConfig {
    pub fn style_for(&self, category: &str) -> &BandStyle {
        self.categories.get(category).unwrap_or(&self.default_style)
    }
}

/// One social network view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphViewConfig {
    /// File stem of the exported graph
    pub name: String,
    pub categories: Vec<String>,
    /// Text appended to the translated category names in the title
    #[serde(default)]
    pub caption: String,
    /// Overrides the generated title
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub curved: bool,
}

/// Social graph export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Pen width per unit of weighted intensity
    pub edge_scale: f64,
    pub edge_colors: BTreeMap<String, String>,
    pub node_colors: BTreeMap<String, String>,
    pub default_edge_color: String,
    pub default_node_color: String,
    pub views: Vec<GraphViewConfig>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let strings = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let cats = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            edge_scale: 1.0 / 800.0,
            edge_colors: strings(&[
                ("Agonista", "red"),
                ("Apaciguamiento", "green"),
                ("Afiliativa", "blue"),
            ]),
            node_colors: strings(&[
                ("N1", "#f1d5f5"),
                ("N2", "#9ed4e6"),
                ("N3", "#e6aa9e"),
                ("N4", "#97bfa8"),
                ("N5", "#a39a8b"),
                ("N6", "#7364b0"),
                ("N7", "#fffac4"),
                ("N8", "#7f7f7f"),
            ]),
            default_edge_color: "black".to_string(),
            default_node_color: "#ffffff".to_string(),
            views: vec![
                GraphViewConfig {
                    name: "agonistic".to_string(),
                    categories: cats(&["Agonista"]),
                    caption: "interactions (pressure)".to_string(),
                    title: None,
                    curved: false,
                },
                GraphViewConfig {
                    name: "agonistic_appeasement".to_string(),
                    categories: cats(&["Agonista", "Apaciguamiento"]),
                    caption: "(pressure and de-escalation)".to_string(),
                    title: None,
                    curved: true,
                },
                GraphViewConfig {
                    name: "affiliative".to_string(),
                    categories: cats(&["Afiliativa"]),
                    caption: "interactions (bonding)".to_string(),
                    title: None,
                    curved: false,
                },
                GraphViewConfig {
                    name: "all".to_string(),
                    categories: cats(&["Agonista", "Apaciguamiento", "Afiliativa"]),
                    caption: String::new(),
                    title: Some("Full social system (all interaction types)".to_string()),
                    curved: true,
                },
            ],
        }
    }
}

/// Complete, immutable configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub inputs: InputFiles,
    pub unmapped_policy: UnmappedPolicy,
    /// Category name used by [`UnmappedPolicy::Unclassified`]
    pub unclassified_label: String,
    pub social: SocialConfig,
    pub translations: TranslationConfig,
    pub heatmap: HeatmapConfig,
    pub bands: BandConfig,
    pub graph: GraphConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            inputs: InputFiles::default(),
            unmapped_policy: UnmappedPolicy::default(),
            unclassified_label: "Unclassified".to_string(),
            social: SocialConfig::default(),
            translations: TranslationConfig::default(),
            heatmap: HeatmapConfig::default(),
            bands: BandConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), AnalysisError> {
        check_labels("social.roster", &self.social.roster)?;
        check_labels("social.categories", &self.social.categories)?;

        if let Some(props) = &self.social.category_proportions {
            for (category, p) in props {
                if !p.is_finite() || *p < 0.0 || *p > 1.0 {
                    return Err(AnalysisError::ConfigError(format!(
                        "category_proportions[{category}] = {p} is not a proportion"
                    )));
                }
            }
        }

        if self.unclassified_label.trim().is_empty() {
            return Err(AnalysisError::ConfigError(
                "unclassified_label must not be empty".to_string(),
            ));
        }

        if !(self.heatmap.vmin < self.heatmap.vmax) {
            return Err(AnalysisError::ConfigError(format!(
                "heatmap.vmin ({}) must be below heatmap.vmax ({})",
                self.heatmap.vmin, self.heatmap.vmax
            )));
        }

        if !(self.graph.edge_scale.is_finite() && self.graph.edge_scale > 0.0) {
            return Err(AnalysisError::ConfigError(
                "graph.edge_scale must be positive".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for focal in &self.inputs.focal {
            if !names.insert(focal.name.as_str()) {
                return Err(AnalysisError::ConfigError(format!(
                    "duplicate focal source name: {}",
                    focal.name
                )));
            }
        }

        Ok(())
    }

    pub fn data_path(&self, file: &str) -> PathBuf {
        self.paths.data_dir.join(file)
    }

    pub fn baselines_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("baselines")
    }

    pub fn group_scans_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("group scans")
    }

    pub fn anomalies_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("anomalies flags")
    }

    pub fn social_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("social roles")
    }

    pub fn focal_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("focal events")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.paths.outputs_dir.join("plots")
    }

    pub fn graphs_dir(&self) -> PathBuf {
        self.social_dir().join("graphs")
    }
}

fn check_labels(field: &str, labels: &[String]) -> Result<(), AnalysisError> {
    if labels.is_empty() {
        return Err(AnalysisError::ConfigError(format!("{field} must not be empty")));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(AnalysisError::ConfigError(format!(
                "{field} contains an empty label"
            )));
        }
        if !seen.insert(label.as_str()) {
            return Err(AnalysisError::ConfigError(format!(
                "{field} contains {label:?} twice"
            )));
        }
    }
    Ok(())
}
