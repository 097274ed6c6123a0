//! Directed social graphs
//!
//! One edge per recognized interaction record, weighted by category rarity.
//! Graph views select a subset of categories and are exported to Graphviz DOT
//! with per-category edge colors and per-individual node colors.

use super::{CategoryWeights, LabelIndex};
use crate::config::{GraphConfig, GraphViewConfig};
use crate::render::{GraphEdgeSpec, GraphNodeSpec, GraphSpec, HeatmapSpec};
use crate::translate::LabelTranslator;
use crate::types::{DirectedEdge, RoleAssignment, SocialInteraction};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt;

/// Edge list of all interactions in `categories`, in input order
pub fn edge_list(
    interactions: &[SocialInteraction],
    categories: &[String],
    weights: &CategoryWeights,
) -> Vec<DirectedEdge> {
    let categories = LabelIndex::new(categories.iter().cloned());
    interactions
        .iter()
        .filter(|r| categories.contains(r.category.trim()))
        .map(|r| {
            let category = r.category.trim();
            DirectedEdge {
                source: r.actor.trim().to_string(),
                target: r.target.trim().to_string(),
                category: category.to_string(),
                raw_count: r.count,
                weighted_intensity: weights.get(category).map(|w| r.count as f64 * w),
            }
        })
        .collect()
}

/// Edge weight of a social graph
#[derive(Debug, Clone, PartialEq)]
pub struct SocialEdge {
    pub category: String,
    pub raw_count: u64,
    pub weighted_intensity: Option<f64>,
}

impl fmt::Display for SocialEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.category, self.raw_count)
    }
}

/// One view of the interaction network
#[derive(Debug, Clone)]
pub struct SocialGraph {
    graph: DiGraph<String, SocialEdge>,
    nodes: HashMap<String, NodeIndex>,
    name: String,
    title: String,
    curved: bool,
}

impl SocialGraph {
    /// Build a view over `individuals` (sorted for stable output) using the
    /// edges whose category is selected by the view
    pub fn build(
        individuals: &[String],
        edges: &[DirectedEdge],
        view: &GraphViewConfig,
        translator: &LabelTranslator,
    ) -> Self {
        let mut sorted = individuals.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for individual in sorted {
            let idx = graph.add_node(individual.clone());
            nodes.insert(individual, idx);
        }

        // category order of the view decides drawing order
        for category in &view.categories {
            for edge in edges.iter().filter(|e| e.category == *category) {
                let (Some(&from), Some(&to)) = (nodes.get(&edge.source), nodes.get(&edge.target)) else {
                    continue;
                };
                graph.add_edge(
                    from,
                    to,
                    SocialEdge {
                        category: edge.category.clone(),
                        raw_count: edge.raw_count,
                        weighted_intensity: edge.weighted_intensity,
                    },
                );
            }
        }

        Self {
            graph,
            nodes,
            name: view.name.clone(),
            title: view_title(view, translator),
            curved: view.curved,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Summed raw count from `source` to `target` over all categories of the view
    pub fn raw_count_between(&self, source: &str, target: &str) -> u64 {
        let (Some(&from), Some(&to)) = (self.nodes.get(source), self.nodes.get(target)) else {
            return 0;
        };
        self.graph
            .edges_connecting(from, to)
            .map(|e| e.weight().raw_count)
            .sum()
    }

    /// Graphviz source of the view
    pub fn to_dot(&self, style: &GraphConfig) -> String {
        let edge_attrs = |_, edge: EdgeReference<'_, SocialEdge>| {
            let weight = edge.weight();
            let color = style
                .edge_colors
                .get(&weight.category)
                .unwrap_or(&style.default_edge_color);
            match weight.weighted_intensity {
                Some(w) => format!("color=\"{color}\", penwidth={:.3}", w * style.edge_scale),
                None => format!("color=\"{color}\""),
            }
        };
        let node_attrs = |_, (_, label): (NodeIndex, &String)| {
            let color = style
                .node_colors
                .get(label)
                .unwrap_or(&style.default_node_color);
            format!("label=\"{label}\", style=filled, fillcolor=\"{color}\"")
        };
        let body = Dot::with_attr_getters(
            &self.graph,
            &[Config::EdgeNoLabel, Config::NodeNoLabel, Config::GraphContentOnly],
            &edge_attrs,
            &node_attrs,
        );

        let splines = if self.curved { "curved" } else { "line" };
        format!(
            "digraph \"{}\" {{\n    label=\"{}\";\n    labelloc=t;\n    splines={splines};\n    node [shape=circle];\n{body}}}\n",
            self.name,
            self.title.replace('"', "\\\"")
        )
    }

    /// Plot-ready description of the view
    pub fn spec(&self, style: &GraphConfig) -> GraphSpec {
        let nodes = self
            .graph
            .node_weights()
            .map(|id| GraphNodeSpec {
                id: id.clone(),
                color: style
                    .node_colors
                    .get(id)
                    .unwrap_or(&style.default_node_color)
                    .clone(),
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|e| {
                let w = e.weight();
                GraphEdgeSpec {
                    source: self.graph[e.source()].clone(),
                    target: self.graph[e.target()].clone(),
                    category: w.category.clone(),
                    color: style
                        .edge_colors
                        .get(&w.category)
                        .unwrap_or(&style.default_edge_color)
                        .clone(),
                    width: w.weighted_intensity.map(|i| i * style.edge_scale),
                }
            })
            .collect();

        GraphSpec {
            name: self.name.clone(),
            title: self.title.clone(),
            curved: self.curved,
            nodes,
            edges,
        }
    }
}

/// Configured title, or the translated categories followed by the caption
pub fn view_title(view: &GraphViewConfig, translator: &LabelTranslator) -> String {
    if let Some(title) = &view.title {
        return title.clone();
    }
    let names: Vec<&str> = view.categories.iter().map(|c| translator.category(c)).collect();
    format!("{} {}", names.join(" + "), view.caption).trim().to_string()
}

/// Individual × interaction system matrix of directional bias
#[derive(Debug, Clone, PartialEq)]
pub struct RoleProfile {
    pub individuals: Vec<String>,
    pub systems: Vec<String>,
    /// `values[individual][system]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl RoleProfile {
    /// Individuals sorted, systems in the given order
    pub fn build(assignments: &[RoleAssignment], systems: &[String]) -> Self {
        let mut individuals: Vec<String> = assignments.iter().map(|a| a.entry.individual.clone()).collect();
        individuals.sort();
        individuals.dedup();

        let mut values = vec![vec![None; systems.len()]; individuals.len()];
        for a in assignments {
            let row = individuals.binary_search(&a.entry.individual);
            let col = systems.iter().position(|s| *s == a.system);
            if let (Ok(r), Some(c)) = (row, col) {
                values[r][c] = Some(a.entry.bias);
            }
        }

        Self {
            individuals,
            systems: systems.to_vec(),
            values,
        }
    }

    pub fn get(&self, individual: &str, system: &str) -> Option<f64> {
        let r = self.individuals.iter().position(|i| i == individual)?;
        let c = self.systems.iter().position(|s| s == system)?;
        self.values[r][c]
    }

    /// Heatmap with a fixed [-1, 1] color range
    pub fn heatmap(&self, translator: &LabelTranslator) -> HeatmapSpec {
        HeatmapSpec {
            name: "entity_role_profiles".to_string(),
            title: "Entity Role Deviation Matrix".to_string(),
            x_label: "Interaction system".to_string(),
            y_label: "Entity".to_string(),
            colorbar_label: "Directional bias (actor ↔ receiver)".to_string(),
            row_labels: self.individuals.clone(),
            column_labels: translator.categories(&self.systems),
            values: self.values.clone(),
            vmin: -1.0,
            vmax: 1.0,
            color_map: "coolwarm".to_string(),
            markers: Vec::new(),
        }
    }
}
