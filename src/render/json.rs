//! JSON plot sink

use super::{BandSpec, GraphSpec, HeatmapSpec, PlotSurface};
use crate::error::AnalysisError;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Writes every spec as `<dir>/<kind>_<name>.json`
#[derive(Debug)]
pub struct JsonPlotSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonPlotSink {
    /// Creates `dir` if it does not exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| AnalysisError::io(&dir, e))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write<T: Serialize>(&mut self, kind: &str, name: &str, spec: &T) -> Result<(), AnalysisError> {
        let path = self.dir.join(format!("{kind}_{name}.json"));
        let json = serde_json::to_string_pretty(spec)?;
        fs::write(&path, json).map_err(|e| AnalysisError::io(&path, e))?;
        debug!(path = %path.display(), "wrote plot spec");
        self.written.push(path);
        Ok(())
    }
}

impl PlotSurface for JsonPlotSink {
    fn heatmap(&mut self, spec: &HeatmapSpec) -> Result<(), AnalysisError> {
        self.write("heatmap", &spec.name, spec)
    }

    fn band(&mut self, spec: &BandSpec) -> Result<(), AnalysisError> {
        self.write("band", &spec.name, spec)
    }

    fn graph(&mut self, spec: &GraphSpec) -> Result<(), AnalysisError> {
        self.write("graph", &spec.name, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GraphNodeSpec;
    use pretty_assertions::assert_eq;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ethoscan-{tag}-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_writes_pretty_json() {
        let dir = temp_dir("json-sink");
        let mut sink = JsonPlotSink::new(&dir).unwrap();

        let spec = GraphSpec {
            name: "agonistic".to_string(),
            title: "Agonistic interactions (pressure)".to_string(),
            curved: false,
            nodes: vec![GraphNodeSpec {
                id: "N1".to_string(),
                color: "#f1d5f5".to_string(),
            }],
            edges: Vec::new(),
        };
        sink.graph(&spec).unwrap();

        assert_eq!(sink.written(), &[dir.join("graph_agonistic.json")]);
        let text = fs::read_to_string(dir.join("graph_agonistic.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["title"], "Agonistic interactions (pressure)");
        assert_eq!(value["nodes"][0]["id"], "N1");
        assert!(text.contains('\n'));

        fs::remove_dir_all(&dir).unwrap();
    }
}
