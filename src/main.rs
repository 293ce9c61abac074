//! Binary entry point for aadhaar-linkage.
//!
//! This binary provides the CLI interface for the identity linkage engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use aadhaar_linkage::cli::{StatusReport, build_request};
use aadhaar_linkage::config::{LinkageConfig, PseudonymizerAlgorithm};
use aadhaar_linkage::observability::{self, InitOptions, LoggingConfig, ObservabilityHandle};
use aadhaar_linkage::{
    Action, LinkageGateway, LinkageService, Pseudonymizer, SqliteIdentityStore,
};
use clap::{Parser, Subcommand};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Gateway type used by the binary.
type Gateway = LinkageGateway<SqliteIdentityStore, Box<dyn Pseudonymizer>>;

/// Aadhaar Linkage - merges identity-document submissions into pseudonymized records.
#[derive(Parser)]
#[command(name = "aadhaar-linkage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "LINKAGE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the command.
    #[arg(long, global = true)]
    metrics: bool,

    /// Data directory holding the identity database.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pseudonymization algorithm: sha256 or hmac.
    #[arg(long, global = true, value_parser = parse_algorithm)]
    pseudonymizer: Option<PseudonymizerAlgorithm>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Link a source to the matching identity, creating it if needed.
    Insert {
        /// Source: Aadhaar, PAN, Voter or Driving.
        #[arg(short, long)]
        source: String,

        /// Attribute as key=value (repeatable).
        #[arg(short, long = "data")]
        data: Vec<String>,
    },

    /// Fork an identity with new attributes.
    Update {
        /// Linkage key of the identity to fork.
        #[arg(short, long)]
        key: String,

        /// Source: Aadhaar, PAN, Voter or Driving.
        #[arg(short, long)]
        source: String,

        /// Attribute as key=value (repeatable).
        #[arg(short, long = "data")]
        data: Vec<String>,
    },

    /// Unlink a source from an identity.
    Delete {
        /// Linkage key of the identity.
        #[arg(short, long)]
        key: String,

        /// Source: Aadhaar, PAN, Voter or Driving.
        #[arg(short, long)]
        source: String,
    },

    /// Show the per-source counters of an identity.
    Search {
        /// Linkage key of the identity.
        #[arg(short, long)]
        key: String,
    },

    /// Process JSON requests from stdin, one per line.
    Process,

    /// Show store statistics.
    Status,

    /// Configuration management.
    Config {
        /// Show effective configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match LinkageConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(algorithm) = cli.pseudonymizer {
        config = config.with_algorithm(algorithm);
    }

    let logging = LoggingConfig::from_settings(&config.logging, cli.verbose);
    let observability = match observability::init(
        &logging,
        InitOptions {
            verbose: cli.verbose,
            metrics: cli.metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = run_command(cli, config);
    print_metrics(&observability);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: LinkageConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Insert { source, data } => {
            cmd_request(&config, Action::Insert, Some(&source), None, &data)
        },

        Commands::Update { key, source, data } => {
            cmd_request(&config, Action::Update, Some(&source), Some(&key), &data)
        },

        Commands::Delete { key, source } => {
            cmd_request(&config, Action::Delete, Some(&source), Some(&key), &[])
        },

        Commands::Search { key } => cmd_request(&config, Action::Search, None, Some(&key), &[]),

        Commands::Process => cmd_process(&config),

        Commands::Status => cmd_status(&config),

        Commands::Config { show } => cmd_config(&config, show),
    }
}

/// Opens the store and wires the gateway.
fn open_gateway(config: &LinkageConfig) -> Result<Gateway, Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    let pseudonymizer = config.build_pseudonymizer()?;
    let service =
        LinkageService::new(store, pseudonymizer).with_lease_timeout(config.lease_timeout);
    Ok(LinkageGateway::new(service))
}

/// Single request command.
///
/// ERROR responses are printed like SUCCESS ones but fail the process.
fn cmd_request(
    config: &LinkageConfig,
    action: Action,
    source: Option<&str>,
    key: Option<&str>,
    data: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = open_gateway(config)?;
    let request = build_request(action, source, key, data)?;
    let response = gateway.handle(&request)?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_success() {
        Ok(())
    } else {
        Err(response.message.into())
    }
}

/// Process command.
fn cmd_process(config: &LinkageConfig) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = open_gateway(config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();

    let stats = gateway.process_lines(stdin.lock(), BufWriter::new(stdout.lock()))?;
    eprintln!(
        "Processed {} request(s): {} succeeded, {} rejected",
        stats.processed, stats.succeeded, stats.rejected
    );
    Ok(())
}

/// Status command.
fn cmd_status(config: &LinkageConfig) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = open_gateway(config)?;
    let service = gateway.service();
    let location = service.store().db_path().map(|p| p.display().to_string());

    let report = StatusReport::collect(service.store(), service.pseudonymizer(), location)?;
    println!("{report}");
    Ok(())
}

/// Config command.
fn cmd_config(config: &LinkageConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{config}");
    } else {
        println!("Use --show to display the effective configuration");
    }
    Ok(())
}

/// Parses the `--pseudonymizer` value.
fn parse_algorithm(value: &str) -> Result<PseudonymizerAlgorithm, String> {
    PseudonymizerAlgorithm::parse(value)
        .ok_or_else(|| format!("unknown pseudonymizer algorithm: {value}"))
}

/// Prints the Prometheus exposition, if a recorder was installed.
fn print_metrics(observability: &ObservabilityHandle) {
    if let Some(metrics) = observability.metrics() {
        eprintln!("{}", metrics.render());
    }
}
