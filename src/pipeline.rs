//! Pipeline orchestration
//!
//! This module provides the public API for ethoscan. It runs both analysis
//! paths over one configuration and writes every derived table, plot spec and
//! graph to the output layout.
//!
//! Anomaly path: Ethogram → Baseline → Proportions → Deviation → Flags
//! Social path:  Ledger → Weights → Roles (+ edges and graph views)

use crate::anomaly::{AlertList, AnomalyFlagger};
use crate::baseline::CategoryBaseline;
use crate::config::{FocalSource, PipelineConfig, UnmappedPolicy};
use crate::deviation::{deviation_limits, DeviationEngine, DeviationLimit, DeviationMatrix, VariabilityBand};
use crate::error::AnalysisError;
use crate::ethogram::{Ethogram, UnmappedSummary};
use crate::proportions::ProportionTable;
use crate::render::{BandSpec, HeatmapSpec, JsonPlotSink, PlotSurface};
use crate::schema;
use crate::social::{classify_roles, edge_list, CategoryWeights, RoleProfile, SocialGraph, SocialLedger};
use crate::translate::LabelTranslator;
use crate::types::{
    CategorizedRecord, ClassifiedRow, DeviationRow, DirectedEdge, EventKey, EventObservation,
    LedgerEntry, RoleAssignment, ScanKey, ScanObservation, SocialInteraction,
};
use crate::{PRODUCER_NAME, VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Raw tables of one run
#[derive(Debug, Clone)]
pub struct Inputs {
    pub ethogram: Ethogram,
    pub scans: Vec<ScanObservation>,
    pub focal: Vec<(FocalSource, Vec<EventObservation>)>,
    pub interactions: Vec<SocialInteraction>,
}

/// Deviations of one focal-individual event sequence
#[derive(Debug, Clone)]
pub struct FocalAnalysis {
    pub name: String,
    pub proportions: ProportionTable<EventKey>,
    pub deviations: Vec<DeviationRow<EventKey>>,
    pub unmapped: UnmappedSummary,
}

/// Everything the anomaly path derives
#[derive(Debug, Clone)]
pub struct ScanAnalysis {
    /// Category universe in ethogram order
    pub universe: Vec<String>,
    pub records: Vec<CategorizedRecord<ScanKey>>,
    pub unmapped: UnmappedSummary,
    pub baseline: CategoryBaseline,
    pub proportions: ProportionTable<ScanKey>,
    pub deviations: Vec<DeviationRow<ScanKey>>,
    pub limits: Vec<DeviationLimit>,
    pub classified: Vec<ClassifiedRow<ScanKey>>,
    pub alerts: AlertList,
    pub focal: Vec<FocalAnalysis>,
}

impl ScanAnalysis {
    /// Observation days in ascending order
    pub fn days(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self.proportions.keys().iter().map(|k| k.day).collect();
        days.dedup();
        days
    }

    /// Variability band of `category` on `day`, styled from the configuration
    pub fn band(&self, config: &PipelineConfig, category: &str, day: u32) -> Result<VariabilityBand, AnalysisError> {
        VariabilityBand::build(
            &self.proportions,
            &self.baseline,
            category,
            day,
            config.bands.style_for(category).limit,
            config.bands.annotate_fraction,
        )
    }
}

/// Everything the social path derives
#[derive(Debug, Clone)]
pub struct SocialAnalysis {
    pub weights: CategoryWeights,
    pub ledger: Vec<LedgerEntry>,
    pub edges: Vec<DirectedEdge>,
    pub roles: Vec<RoleAssignment>,
}

/// Row counts recorded in the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCounts {
    pub scan_records: usize,
    pub unmapped_records: usize,
    pub categories: usize,
    pub scans: usize,
    pub alerts: usize,
    pub focal_events: usize,
    pub interactions: usize,
    pub individuals: usize,
}

/// Provenance of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub producer: String,
    pub version: String,
    pub computed_at_utc: DateTime<Utc>,
    pub unmapped_policy: UnmappedPolicy,
    pub counts: RunCounts,
    /// Paths relative to the outputs directory
    pub outputs: Vec<String>,
}

/// Runs the analysis for one configuration
pub struct EthoProcessor {
    config: PipelineConfig,
    translator: LabelTranslator,
    run_id: String,
}

impl EthoProcessor {
    /// Create a processor with a fresh run id
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_run_id(config, Uuid::new_v4().to_string())
    }

    /// Create a processor with a specific run id
    pub fn with_run_id(config: PipelineConfig, run_id: String) -> Self {
        let translator = LabelTranslator::new(&config.translations);
        Self {
            config,
            translator,
            run_id,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn translator(&self) -> &LabelTranslator {
        &self.translator
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Read every input table named by the configuration
    pub fn load_inputs(&self) -> Result<Inputs, AnalysisError> {
        let files = &self.config.inputs;
        let ethogram = Ethogram::new(schema::read_ethogram(&self.config.data_path(&files.ethogram))?)?;
        let scans = schema::read_scans(&self.config.data_path(&files.group_scans))?;

        let mut focal = Vec::with_capacity(files.focal.len());
        for source in &files.focal {
            let events = schema::read_events(&self.config.data_path(&source.file))?;
            focal.push((source.clone(), events));
        }

        let interactions = schema::read_interactions(&self.config.data_path(&files.social))?;

        Ok(Inputs {
            ethogram,
            scans,
            focal,
            interactions,
        })
    }

    /// Anomaly path: baseline, scan proportions, deviations, flags, plus the
    /// event deviations of every focal file
    pub fn analyze_scans(&self, inputs: &Inputs) -> Result<ScanAnalysis, AnalysisError> {
        let policy = self.config.unmapped_policy;
        let label = self.config.unclassified_label.as_str();

        let scans = inputs.ethogram.map_records(&inputs.scans, policy, label)?;
        let mut focal_mapped = Vec::with_capacity(inputs.focal.len());
        for (source, events) in &inputs.focal {
            focal_mapped.push((source, inputs.ethogram.map_records(events, policy, label)?));
        }

        let uses_unclassified = scans.uses_unclassified() || focal_mapped.iter().any(|(_, m)| m.uses_unclassified());
        let universe = inputs.ethogram.universe(uses_unclassified.then_some(label));

        let baseline = CategoryBaseline::build(&scans.records, &universe);
        let categories = baseline.categories();
        let proportions = ProportionTable::build(&scans.records, &categories);

        let engine = DeviationEngine::new(&baseline);
        let deviations = engine.apply(&proportions);
        let limits = deviation_limits(&deviations, &categories);

        let classified = AnomalyFlagger::from_table(&proportions).classify_all(&proportions);
        let alerts = AlertList::from_classified(&classified);

        let focal = focal_mapped
            .into_iter()
            .map(|(source, mapped)| {
                let proportions = ProportionTable::build(&mapped.records, &categories);
                FocalAnalysis {
                    name: source.name.clone(),
                    deviations: engine.apply(&proportions),
                    proportions,
                    unmapped: mapped.unmapped,
                }
            })
            .collect();

        info!(
            categories = universe.len(),
            scans = proportions.keys().len(),
            alerts = alerts.len(),
            "scan analysis complete"
        );

        Ok(ScanAnalysis {
            universe,
            records: scans.records,
            unmapped: scans.unmapped,
            baseline,
            proportions,
            deviations,
            limits,
            classified,
            alerts,
            focal,
        })
    }

    /// Social path. `baseline` supplies rarity weights for categories whose
    /// proportion is not pinned in the configuration.
    pub fn analyze_social(
        &self,
        inputs: &Inputs,
        baseline: Option<&CategoryBaseline>,
    ) -> Result<SocialAnalysis, AnalysisError> {
        let social = &self.config.social;
        let weights = CategoryWeights::resolve(social, baseline);

        let ledger = SocialLedger::build(&inputs.interactions, &social.roster, &social.categories)?;
        let entries = ledger.entries(&weights);
        let edges = edge_list(&inputs.interactions, &social.categories, &weights);
        let roles = classify_roles(&entries, &social.categories);

        Ok(SocialAnalysis {
            weights,
            ledger: entries,
            edges,
            roles,
        })
    }

    /// Write every output table and the graph DOT files. Returns the written
    /// paths.
    pub fn write_outputs(&self, scans: &ScanAnalysis, social: &SocialAnalysis) -> Result<Vec<PathBuf>, AnalysisError> {
        let config = &self.config;
        let mut written = Vec::new();
        let mut emit = |path: PathBuf, result: Result<(), AnalysisError>| -> Result<(), AnalysisError> {
            result?;
            written.push(path);
            Ok(())
        };

        let path = config.baselines_dir().join("category_baseline.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_baseline(f, &scans.baseline)))?;

        let path = config.group_scans_dir().join("scans_category_proportions_all_days.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_scan_proportions(f, &scans.proportions)))?;

        let path = config.group_scans_dir().join("category_deviation_limits.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_deviation_limits(f, &scans.limits)))?;

        let path = config.anomalies_dir().join("scan_anomaly_flags_with_severity.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_alerts(f, &scans.alerts)))?;

        for focal in &scans.focal {
            let path = config
                .focal_dir()
                .join(format!("{}_event_category_deviations.csv", focal.name));
            emit(path.clone(), schema::write_file(&path, |f| schema::write_event_deviations(f, &focal.deviations)))?;
        }

        let path = config.social_dir().join("individual_social_ledgers.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_ledger(f, &social.ledger)))?;

        let path = config.social_dir().join("directed_social_edges.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_edges(f, &social.edges)))?;

        let path = config.social_dir().join("individual_roles_by_category.csv");
        emit(path.clone(), schema::write_file(&path, |f| schema::write_roles(f, &social.roles)))?;

        let graphs_dir = config.graphs_dir();
        fs::create_dir_all(&graphs_dir).map_err(|e| AnalysisError::io(&graphs_dir, e))?;
        for graph in self.graphs(social) {
            let path = graphs_dir.join(format!("{}.dot", graph.name()));
            let dot = graph.to_dot(&config.graph);
            emit(path.clone(), fs::write(&path, dot).map_err(|e| AnalysisError::io(&path, e)))?;
        }

        info!(files = written.len(), "wrote output tables");
        Ok(written)
    }

    /// One graph per configured view, over the roster
    pub fn graphs(&self, social: &SocialAnalysis) -> Vec<SocialGraph> {
        self.config
            .graph
            .views
            .iter()
            .map(|view| SocialGraph::build(&self.config.social.roster, &social.edges, view, &self.translator))
            .collect()
    }

    /// Hand every figure of the run to `surface`. Returns the number of specs.
    pub fn render<S: PlotSurface>(
        &self,
        surface: &mut S,
        scans: &ScanAnalysis,
        social: &SocialAnalysis,
    ) -> Result<usize, AnalysisError> {
        let config = &self.config;
        let categories = scans.baseline.categories();
        let mut rendered = 0;

        for day in scans.days() {
            let matrix = DeviationMatrix::pivot(&scans.deviations, &categories, |k: &ScanKey| {
                (k.day == day).then_some(k.scan)
            });
            surface.heatmap(&HeatmapSpec::deviation(
                format!("group_day{day}"),
                format!("Category deviation heatmap: Day {day}"),
                "Scan (time)",
                &matrix,
                &config.heatmap,
                &self.translator,
            ))?;
            rendered += 1;
        }

        for focal in &scans.focal {
            let matrix = DeviationMatrix::pivot(&focal.deviations, &categories, |k: &EventKey| Some(*k));
            let spec = HeatmapSpec::deviation(
                format!("{}_events", focal.name),
                format!("{} event deviation heatmap", focal.name),
                "Event sequence (behavior-driven)",
                &matrix,
                &config.heatmap,
                &self.translator,
            )
            .with_markers(&config.heatmap.event_markers);
            surface.heatmap(&spec)?;
            rendered += 1;
        }

        for (category, style) in &config.bands.categories {
            if scans.baseline.get(category).is_none() {
                continue;
            }
            for day in scans.days() {
                let band = scans.band(config, category, day)?;
                surface.band(&BandSpec::from_band(&band, style, &self.translator))?;
                rendered += 1;
            }
        }

        for graph in self.graphs(social) {
            surface.graph(&graph.spec(&config.graph))?;
            rendered += 1;
        }

        let profile = RoleProfile::build(&social.roles, &config.social.categories);
        surface.heatmap(&profile.heatmap(&self.translator))?;
        rendered += 1;

        info!(specs = rendered, "rendered plot specs");
        Ok(rendered)
    }

    /// Manifest describing a completed run
    pub fn manifest(&self, scans: &ScanAnalysis, social: &SocialAnalysis, outputs: &[PathBuf]) -> RunManifest {
        let outputs_dir = &self.config.paths.outputs_dir;
        RunManifest {
            run_id: self.run_id.clone(),
            producer: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            computed_at_utc: Utc::now(),
            unmapped_policy: self.config.unmapped_policy,
            counts: RunCounts {
                scan_records: scans.records.len(),
                unmapped_records: scans.unmapped.records()
                    + scans.focal.iter().map(|f| f.unmapped.records()).sum::<usize>(),
                categories: scans.universe.len(),
                scans: scans.proportions.keys().len(),
                alerts: scans.alerts.len(),
                focal_events: scans.focal.iter().map(|f| f.proportions.keys().len()).sum(),
                interactions: social.edges.len(),
                individuals: self.config.social.roster.len(),
            },
            outputs: outputs.iter().map(|p| relative(p, outputs_dir)).collect(),
        }
    }

    /// Full batch run: load, analyze, write tables, render JSON specs into the
    /// plots directory, and write `run_manifest.json`
    pub fn run(&self) -> Result<RunManifest, AnalysisError> {
        let inputs = self.load_inputs()?;
        let scans = self.analyze_scans(&inputs)?;
        let social = self.analyze_social(&inputs, Some(&scans.baseline))?;

        let mut outputs = self.write_outputs(&scans, &social)?;
        let mut sink = JsonPlotSink::new(self.config.plots_dir())?;
        self.render(&mut sink, &scans, &social)?;
        outputs.extend(sink.written().iter().cloned());

        let manifest = self.manifest(&scans, &social, &outputs);
        let path = self.config.paths.outputs_dir.join("run_manifest.json");
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, json).map_err(|e| AnalysisError::io(&path, e))?;

        info!(run_id = %manifest.run_id, outputs = manifest.outputs.len(), "run complete");
        Ok(manifest)
    }
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
