//! ethoscan - Batch analysis engine for ethology observation data
//!
//! ethoscan turns tabular behavior observations into category baselines, scan
//! anomaly flags and social role ledgers through two deterministic paths:
//!
//! - **Anomaly path**: ethogram mapping → category baseline → per-scan
//!   proportions → deviation from baseline → quantile-tiered anomaly flags
//! - **Social path**: directed interaction ledger → rarity weighting → roles
//!
//! Figures are never drawn here; they are described as plot specs and handed
//! to a [`render::PlotSurface`].

pub mod anomaly;
pub mod baseline;
pub mod config;
pub mod deviation;
pub mod error;
pub mod ethogram;
pub mod explore;
pub mod pipeline;
pub mod proportions;
pub mod quantile;
pub mod render;
pub mod schema;
pub mod social;
pub mod translate;
pub mod types;

pub use anomaly::{Alert, AlertList, AnomalyFlagger};
pub use baseline::CategoryBaseline;
pub use config::{PipelineConfig, UnmappedPolicy};
pub use error::AnalysisError;
pub use ethogram::Ethogram;
pub use explore::{drill_down, ExploreSession};
pub use pipeline::{EthoProcessor, RunManifest};
pub use proportions::ProportionTable;

/// Version recorded in every run manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name recorded in every run manifest
pub const PRODUCER_NAME: &str = "ethoscan";
