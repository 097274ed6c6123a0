//! ethoscan CLI - Command-line interface for the ethoscan analysis engine
//!
//! Commands:
//! - run: Full batch run (tables, plot specs, graphs, manifest)
//! - baseline / flags / limits: Print one anomaly-path table
//! - explore: Interactive drill-down into scan anomalies
//! - social: Print role tables per interaction system
//! - band: Print the variability band of one category on one day
//! - doctor: Diagnose configuration and input files
//! - config: Print the effective or default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ethoscan::config::{PipelineConfig, UnmappedPolicy};
use ethoscan::explore::ExploreSession;
use ethoscan::pipeline::EthoProcessor;
use ethoscan::render::{table, BandSpec};
use ethoscan::{AnalysisError, PRODUCER_NAME, VERSION};

/// ethoscan - Baselines, anomaly flags and social roles from behavior observations
#[derive(Parser)]
#[command(name = "ethoscan")]
#[command(version = VERSION)]
#[command(about = "Analyze ethology observation tables", long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the outputs directory
    #[arg(long, global = true)]
    outputs_dir: Option<PathBuf>,

    /// Override the unmapped-behavior policy
    #[arg(long, global = true)]
    unmapped: Option<PolicyArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both analysis paths and write every output
    Run {
        /// Print the run manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the category baseline
    Baseline {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print flagged scans in alert order
    Flags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse scan anomalies and drill down into their behaviors
    Explore,

    /// Print social role tables
    Social {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the variability band of one category on one day
    Band {
        /// Category as it appears in the ethogram (e.g. "Rumiación")
        #[arg(long)]
        category: String,

        /// Observation day
        #[arg(long)]
        day: u32,
    },

    /// Print per-category deviation limits (P98 of |deviation|)
    Limits {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input files
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration as JSON
    Config {
        /// Print built-in defaults instead of the effective configuration
        #[arg(long)]
        defaults: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Remove unmapped records
    Drop,
    /// Count unmapped records as "Unclassified"
    Unclassified,
    /// Abort on any unmapped record
    Fail,
}

impl From<PolicyArg> for UnmappedPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Drop => UnmappedPolicy::Drop,
            PolicyArg::Unclassified => UnmappedPolicy::Unclassified,
            PolicyArg::Fail => UnmappedPolicy::Fail,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ethoscan=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EthoCliError> {
    if let Commands::Config { defaults: true } = cli.command {
        println!("{}", PipelineConfig::default().to_json_pretty()?);
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { json } => cmd_run(config, json),
        Commands::Baseline { json } => cmd_baseline(config, json),
        Commands::Flags { json } => cmd_flags(config, json),
        Commands::Explore => cmd_explore(config),
        Commands::Social { json } => cmd_social(config, json),
        Commands::Band { category, day } => cmd_band(config, &category, day),
        Commands::Limits { json } => cmd_limits(config, json),
        Commands::Doctor { json } => cmd_doctor(&config, cli.config.as_deref(), json),
        Commands::Config { .. } => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, EthoCliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.outputs_dir {
        config.paths.outputs_dir = dir.clone();
    }
    if let Some(policy) = cli.unmapped {
        config.unmapped_policy = policy.into();
    }
    config.validate()?;
    Ok(config)
}

fn cmd_run(config: PipelineConfig, json: bool) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let manifest = processor.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        let counts = &manifest.counts;
        println!("ethoscan run {}", manifest.run_id);
        println!("  Policy       : {}", manifest.unmapped_policy.as_str());
        println!("  Categories   : {}", counts.categories);
        println!("  Scans        : {}  ({} records, {} unmapped)", counts.scans, counts.scan_records, counts.unmapped_records);
        println!("  Alerts       : {}", counts.alerts);
        println!("  Focal events : {}", counts.focal_events);
        println!("  Interactions : {}  ({} individuals)", counts.interactions, counts.individuals);
        println!("  Outputs      : {} files under {}", manifest.outputs.len(), processor.config().paths.outputs_dir.display());
    }
    Ok(())
}

fn cmd_baseline(config: PipelineConfig, json: bool) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let scans = processor.analyze_scans(&processor.load_inputs()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(scans.baseline.entries())?);
    } else {
        print!("{}", table::baseline_table(&scans.baseline, processor.translator()));
    }
    Ok(())
}

fn cmd_flags(config: PipelineConfig, json: bool) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let scans = processor.analyze_scans(&processor.load_inputs()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(scans.alerts.as_slice())?);
    } else {
        print!("{}", table::flags_table(&scans.alerts, processor.translator()));
    }
    Ok(())
}

fn cmd_explore(config: PipelineConfig) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let scans = processor.analyze_scans(&processor.load_inputs()?)?;

    if !atty::is(atty::Stream::Stdin) {
        tracing::info!("stdin is not a terminal; reading selections from input stream");
    }

    let session = ExploreSession::new(&scans.alerts, &scans.records, processor.translator());
    let stdin = io::stdin();
    let stdout = io::stdout();
    session.run(stdin.lock(), stdout.lock())?;
    Ok(())
}

fn cmd_social(config: PipelineConfig, json: bool) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let inputs = processor.load_inputs()?;
    let baseline = if processor.config().social.category_proportions.is_some() {
        None
    } else {
        Some(processor.analyze_scans(&inputs)?.baseline)
    };
    let social = processor.analyze_social(&inputs, baseline.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&social.roles)?);
    } else {
        print!(
            "{}",
            table::roles_table(&social.roles, &processor.config().social.categories, processor.translator())
        );
    }
    Ok(())
}

fn cmd_band(config: PipelineConfig, category: &str, day: u32) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let scans = processor.analyze_scans(&processor.load_inputs()?)?;
    let band = scans.band(processor.config(), category, day)?;
    let spec = BandSpec::from_band(&band, processor.config().bands.style_for(category), processor.translator());

    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

fn cmd_limits(config: PipelineConfig, json: bool) -> Result<(), EthoCliError> {
    let processor = EthoProcessor::new(config);
    let scans = processor.analyze_scans(&processor.load_inputs()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scans.limits)?);
    } else {
        print!("{}", table::limits_table(&scans.limits, processor.translator()));
    }
    Ok(())
}

fn cmd_doctor(config: &PipelineConfig, config_path: Option<&Path>, json: bool) -> Result<(), EthoCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("ethoscan version {}", VERSION),
    });

    checks.push(DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Ok,
        message: match config_path {
            Some(path) => format!("Configuration loaded from {}", path.display()),
            None => "Using built-in defaults".to_string(),
        },
    });

    let inputs = &config.inputs;
    let mut files = vec![
        ("ethogram", inputs.ethogram.as_str()),
        ("group_scans", inputs.group_scans.as_str()),
        ("social", inputs.social.as_str()),
    ];
    for focal in &inputs.focal {
        files.push(("focal", focal.file.as_str()));
    }
    for (name, file) in files {
        let path = config.data_path(file);
        checks.push(if path.is_file() {
            DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message: format!("{} found", path.display()),
            }
        } else {
            DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("{} does not exist", path.display()),
            }
        });
    }

    if let Ok(ethogram) = ethoscan::schema::read_ethogram(&config.data_path(&inputs.ethogram)) {
        checks.push(match ethoscan::Ethogram::new(ethogram) {
            Ok(ethogram) => DoctorCheck {
                name: "ethogram_mapping".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} behaviors in {} categories",
                    ethogram.len(),
                    ethogram.categories().len()
                ),
            },
            Err(e) => DoctorCheck {
                name: "ethogram_mapping".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    checks.push(DoctorCheck {
        name: "weights".to_string(),
        status: CheckStatus::Ok,
        message: if config.social.category_proportions.is_some() {
            "Rarity weights pinned in configuration".to_string()
        } else {
            "Rarity weights derived from the run baseline".to_string()
        },
    });

    checks.push(if config.paths.outputs_dir.exists() {
        DoctorCheck {
            name: "outputs".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} exists", config.paths.outputs_dir.display()),
        }
    } else {
        DoctorCheck {
            name: "outputs".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} will be created", config.paths.outputs_dir.display()),
        }
    });

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (explore is interactive)".to_string()
        } else {
            "stdin is a pipe (explore reads scripted selections)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("ethoscan Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }
    io::stdout().flush()?;

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(EthoCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error handling

#[derive(Debug)]
enum EthoCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for EthoCliError {
    fn from(e: io::Error) -> Self {
        EthoCliError::Io(e)
    }
}

impl From<AnalysisError> for EthoCliError {
    fn from(e: AnalysisError) -> Self {
        EthoCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for EthoCliError {
    fn from(e: serde_json::Error) -> Self {
        EthoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: Option<&str>) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

impl From<EthoCliError> for CliError {
    fn from(e: EthoCliError) -> Self {
        match e {
            EthoCliError::Io(e) => CliError::new("IO_ERROR", e.to_string(), Some("Check file paths and permissions")),
            EthoCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), Some("Check JSON syntax")),
            EthoCliError::DoctorFailed => CliError::new(
                "DOCTOR_FAILED",
                "One or more checks failed".to_string(),
                Some("Fix the [ERR] checks above and rerun 'ethoscan doctor'"),
            ),
            EthoCliError::Analysis(e) => {
                let message = e.to_string();
                match e {
                    AnalysisError::Io { .. } | AnalysisError::Terminal(_) => {
                        CliError::new("IO_ERROR", message, Some("Check file paths and permissions"))
                    }
                    AnalysisError::Csv(_) | AnalysisError::InvalidRecord(_) => CliError::new(
                        "INVALID_INPUT",
                        message,
                        Some("Check the CSV headers and the offending row"),
                    ),
                    AnalysisError::JsonError(_) | AnalysisError::ConfigError(_) => CliError::new(
                        "CONFIG_ERROR",
                        message,
                        Some("Run 'ethoscan config --defaults' for a valid template"),
                    ),
                    AnalysisError::EthogramConflict { .. } => CliError::new(
                        "ETHOGRAM_CONFLICT",
                        message,
                        Some("Each behavior must map to exactly one category"),
                    ),
                    AnalysisError::UnmappedBehaviors(_) => CliError::new(
                        "UNMAPPED_BEHAVIORS",
                        message,
                        Some("Add the behaviors to the ethogram or use --unmapped unclassified"),
                    ),
                    AnalysisError::UnknownIndividual(_) => CliError::new(
                        "UNKNOWN_INDIVIDUAL",
                        message,
                        Some("Add the individual to social.roster in the configuration"),
                    ),
                    AnalysisError::UnknownCategory(_) => CliError::new(
                        "UNKNOWN_CATEGORY",
                        message,
                        Some("Run 'ethoscan baseline' to list the categories"),
                    ),
                    AnalysisError::InvalidSelection(_) | AnalysisError::AlertOutOfRange { .. } => {
                        CliError::new("INVALID_SELECTION", message, None)
                    }
                }
            }
        }
    }
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
