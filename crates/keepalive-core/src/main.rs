//! keepalive CLI
//!
//! Command-line interface for the keepalive service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use keepalive::api::HttpServer;
use keepalive::auth::GoogleTokenVerifier;
use keepalive::checker::{CycleReport, HealthChecker, RecordOutcome};
use keepalive::config::LoggingConfig;
use keepalive::registry::UrlRegistry;
use keepalive::{store, Config};

/// keepalive - keep free-tier backends awake
#[derive(Parser)]
#[command(name = "keepalive")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "KEEPALIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, env = "KEEPALIVE_HOST")]
        host: Option<String>,

        /// HTTP API port
        #[arg(long, env = "KEEPALIVE_PORT")]
        port: Option<u16>,

        /// Also run the health checker in-process
        #[arg(long)]
        with_checker: bool,
    },

    /// Run a single check cycle over all records
    Check {
        /// Start immediately instead of waiting a random jitter
        #[arg(long)]
        no_jitter: bool,
    },

    /// Run check cycles forever on a fixed interval
    Watch {
        /// Time between cycles (e.g. "10m"); defaults to checker.interval
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,
    },

    /// Inspect and edit an owner's URL list directly
    Urls {
        #[command(subcommand)]
        command: UrlsCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum UrlsCommands {
    /// List an owner's URLs and status
    List {
        /// Owner identity (verified email)
        #[arg(long)]
        owner: String,
    },

    /// Add a URL for an owner
    Add {
        /// Owner identity (verified email)
        #[arg(long)]
        owner: String,

        /// URL to keep awake
        url: String,
    },

    /// Remove a URL from an owner's list
    Remove {
        /// Owner identity (verified email)
        #[arg(long)]
        owner: String,

        /// URL to stop pinging
        url: String,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            with_checker,
        } => run_serve(config, host, port, with_checker).await,
        Commands::Check { no_jitter } => run_check(config, no_jitter, cli.format).await,
        Commands::Watch { interval } => run_watch(config, interval).await,
        Commands::Urls { command } => run_urls(config, command, cli.format).await,
        Commands::Completions { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if config.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_serve(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    with_checker: bool,
) -> anyhow::Result<()> {
    let store = store::from_config(&config.store)?;
    let registry = Arc::new(UrlRegistry::from_config(store.clone(), &config.registry)?);
    let verifier = Arc::new(GoogleTokenVerifier::new(&config.auth)?);

    let checker_handle = if with_checker {
        let checker = Arc::new(HealthChecker::from_config(store, config.checker.clone())?);
        let every = config.checker.interval;
        Some(tokio::spawn(async move { checker.start(every).await }))
    } else {
        None
    };

    let addr = format!(
        "{}:{}",
        host.unwrap_or(config.server.host),
        port.unwrap_or(config.server.port)
    );
    info!(addr = %addr, backend = ?config.store.backend, "Starting keepalive API");

    HttpServer::new(registry, verifier)
        .serve(&addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl+C received, shutting down...");
        })
        .await?;

    if let Some(handle) = checker_handle {
        handle.abort();
    }

    Ok(())
}

async fn run_check(config: Config, no_jitter: bool, format: OutputFormat) -> anyhow::Result<()> {
    let store = store::from_config(&config.store)?;
    let checker = HealthChecker::from_config(store, config.checker)?;

    let report = if no_jitter {
        checker.run_pass().await?
    } else {
        checker.run_cycle().await?
    };

    print_report(&report, format)?;
    Ok(())
}

async fn run_watch(config: Config, interval: Option<Duration>) -> anyhow::Result<()> {
    let every = interval.unwrap_or(config.checker.interval);
    let store = store::from_config(&config.store)?;
    let checker = HealthChecker::from_config(store, config.checker)?;

    tokio::select! {
        () = checker.start(every) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, stopping checker");
        }
    }

    Ok(())
}

async fn run_urls(config: Config, command: UrlsCommands, format: OutputFormat) -> anyhow::Result<()> {
    let store = store::from_config(&config.store)?;
    let registry = UrlRegistry::from_config(store, &config.registry)?;

    let (urls, status) = match command {
        UrlsCommands::List { owner } => {
            let listing = registry.get_urls(&owner).await?;
            (listing.urls, Some(listing.status))
        }
        UrlsCommands::Add { owner, url } => (registry.add_url(&owner, &url).await?, None),
        UrlsCommands::Remove { owner, url } => (registry.remove_url(&owner, &url).await?, None),
    };

    match format {
        OutputFormat::Json => {
            let value = match status {
                Some(status) => serde_json::json!({ "urls": urls, "status": status }),
                None => serde_json::json!({ "urls": urls }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            if let Some(status) = status {
                println!("Status: {status}");
            }
            if urls.is_empty() {
                println!("No URLs monitored.");
            }
            for url in urls {
                println!("  {url}");
            }
        }
    }

    Ok(())
}

fn print_report(report: &CycleReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!(
                "Cycle started {} (jitter {:?}), {} record(s)",
                report.started_at.to_rfc3339(),
                report.jitter,
                report.records.len()
            );
            for record in &report.records {
                match &record.outcome {
                    RecordOutcome::NoUrls => println!("  {:<40} no URLs", record.title),
                    RecordOutcome::Checked { checks, transition } => {
                        println!("  {:<40} {}", record.title, transition.status);
                        for check in checks {
                            let verdict = if check.recovered() {
                                "recovered"
                            } else if check.is_alive() {
                                "up"
                            } else {
                                "FAILED"
                            };
                            println!("      {} {verdict}", check.url);
                        }
                    }
                    RecordOutcome::Errored { error } => {
                        println!("  {:<40} error: {error}", record.title);
                    }
                }
            }
        }
    }
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "keepalive", &mut io::stdout());
}
