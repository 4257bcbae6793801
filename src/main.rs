use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use lender_match::config::{scoring_toml, LoggingSettings, Settings, SettingsError};
use lender_match::core::{program_diagnostics, Matcher, ScoringConfig};
use lender_match::error::MatchError;
use lender_match::models::{Application, Catalog, MatchReport};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("failed to encode output: {0}")]
    Encode(String),

    #[error("catalog has {0} configuration problem(s)")]
    InvalidCatalog(usize),
}

#[derive(Parser, Debug)]
#[command(
    name = "lender-match",
    about = "Match a loan application against lender program policies",
    version
)]
struct Cli {
    /// Configuration file (defaults to config/default.toml + config/local.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an application against a lender catalog
    Match(MatchArgs),
    /// Report policies that do not compile and programs with inverted bounds
    CheckCatalog(CatalogArgs),
    /// Print the default fit scoring configuration as TOML
    ScoringDefaults,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Application JSON file
    #[arg(long)]
    application: PathBuf,
    /// Lender catalog JSON file
    #[arg(long)]
    catalog: PathBuf,
    /// Evaluation date for derived criteria (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<NaiveDate>,
    /// Evaluate programs concurrently
    #[arg(long)]
    parallel: bool,
    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Lender catalog JSON file
    #[arg(long)]
    catalog: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(&LoggingSettings::default());
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging);

    let result = match cli.command {
        Command::Match(args) => run_match(args, &settings).await,
        Command::CheckCatalog(args) => check_catalog(&args.catalog),
        Command::ScoringDefaults => print_scoring_defaults(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so stdout stays machine-readable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

async fn run_match(args: MatchArgs, settings: &Settings) -> Result<(), CliError> {
    let application: Application = read_json(&args.application)?;
    let catalog: Catalog = read_json(&args.catalog)?;

    let mut matcher = Matcher::new(settings.scoring.clone());
    if let Some(as_of) = args.as_of.or(settings.matching.as_of) {
        matcher = matcher.with_as_of(as_of);
    }

    info!(
        "Matching {} against {} lenders ({} programs), as of {}",
        application.business.name,
        catalog.lenders.len(),
        catalog.program_count(),
        matcher.as_of()
    );

    let report = if args.parallel || settings.matching.parallel {
        matcher
            .find_matches_parallel(Arc::new(application), Arc::new(catalog))
            .await?
    } else {
        matcher.find_matches(&application, &catalog)?
    };

    for excluded in &report.excluded {
        warn!(
            "{} / {} excluded: {}",
            excluded.lender_name, excluded.program_name, excluded.diagnostic
        );
    }

    println!("{}", encode_report(&report, args.pretty)?);
    Ok(())
}

fn check_catalog(path: &Path) -> Result<(), CliError> {
    let catalog: Catalog = read_json(path)?;
    let mut problems = 0;

    for lender in &catalog.lenders {
        for program in &lender.programs {
            for problem in program_diagnostics(program) {
                problems += 1;
                println!("{} / {}: {}", lender.name, program.name, problem);
            }
        }
    }

    if problems > 0 {
        return Err(CliError::InvalidCatalog(problems));
    }

    info!(
        "Catalog OK: {} lenders, {} programs",
        catalog.lenders.len(),
        catalog.program_count()
    );
    Ok(())
}

fn print_scoring_defaults() -> Result<(), CliError> {
    let rendered = scoring_toml(&ScoringConfig::default())
        .map_err(|e| CliError::Encode(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

fn encode_report(report: &MatchReport, pretty: bool) -> Result<String, CliError> {
    let encoded = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    encoded.map_err(|e| CliError::Encode(e.to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
