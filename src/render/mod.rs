//! Plot specifications and the surfaces that receive them
//!
//! The analysis never draws. It describes each figure as a plain spec
//! (labels already translated, values untouched) and hands it to a
//! [`PlotSurface`]. [`JsonPlotSink`] persists specs for external plotting tools;
//! the [`table`] functions format results for the terminal.

pub mod json;
pub mod table;

pub use json::JsonPlotSink;

use crate::config::{BandStyle, EventMarker, HeatmapConfig};
use crate::deviation::{BandPoint, DeviationMatrix, VariabilityBand};
use crate::error::AnalysisError;
use crate::translate::LabelTranslator;
use serde::Serialize;
use std::fmt::Display;

/// Anything that can display or store plot specs
pub trait PlotSurface {
    fn heatmap(&mut self, spec: &HeatmapSpec) -> Result<(), AnalysisError>;
    fn band(&mut self, spec: &BandSpec) -> Result<(), AnalysisError>;
    fn graph(&mut self, spec: &GraphSpec) -> Result<(), AnalysisError>;
}

/// Category × column color grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapSpec {
    /// File stem
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub colorbar_label: String,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// `values[row][column]`; `None` renders as a blank cell
    pub values: Vec<Vec<Option<f64>>>,
    pub vmin: f64,
    pub vmax: f64,
    pub color_map: String,
    pub markers: Vec<EventMarker>,
}

impl HeatmapSpec {
    /// Deviation heatmap of a pivoted matrix, rows labelled with translated
    /// categories
    pub fn deviation<C: Display>(
        name: impl Into<String>,
        title: impl Into<String>,
        x_label: impl Into<String>,
        matrix: &DeviationMatrix<C>,
        config: &HeatmapConfig,
        translator: &LabelTranslator,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_label: x_label.into(),
            y_label: "Behavioral category".to_string(),
            colorbar_label: "Deviation from baseline".to_string(),
            row_labels: translator.categories(&matrix.categories),
            column_labels: matrix.columns.iter().map(|c| c.to_string()).collect(),
            values: matrix.values.clone(),
            vmin: config.vmin,
            vmax: config.vmax,
            color_map: config.color_map.clone(),
            markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: &[EventMarker]) -> Self {
        self.markers = markers.to_vec();
        self
    }
}

/// One category's deviation series for one day against its normal range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSpec {
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub category_label: String,
    pub day: u32,
    /// Lower edge of the shaded normal range (deviation units)
    pub lower: f64,
    pub upper: f64,
    /// Symmetric y-axis limit
    pub limit: f64,
    pub color: String,
    pub points: Vec<BandPoint>,
}

impl BandSpec {
    pub fn from_band(band: &VariabilityBand, style: &BandStyle, translator: &LabelTranslator) -> Self {
        let label = translator.category(&band.category).to_string();
        Self {
            name: format!("band_{}_day{}", slug(&band.category), band.day),
            title: format!("Deviation Analysis: {label} (Day {})", band.day),
            x_label: "Scan (time intervals)".to_string(),
            y_label: "Deviation from baseline".to_string(),
            category_label: label,
            day: band.day,
            lower: band.lower,
            upper: band.upper,
            limit: band.limit,
            color: style.color.clone(),
            points: band.points.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNodeSpec {
    pub id: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdgeSpec {
    pub source: String,
    pub target: String,
    pub category: String,
    pub color: String,
    /// Line width, `None` when the category has no rarity weight
    pub width: Option<f64>,
}

/// Directed interaction network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSpec {
    pub name: String,
    pub title: String,
    pub curved: bool,
    pub nodes: Vec<GraphNodeSpec>,
    pub edges: Vec<GraphEdgeSpec>,
}

/// ASCII file-name stem for a data label
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars().flat_map(char::to_lowercase) {
        let ch = match ch {
            'á' | 'à' => 'a',
            'é' | 'è' => 'e',
            'í' => 'i',
            'ó' | 'ò' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            c => c,
        };
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
