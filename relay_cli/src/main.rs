//! relay - install, launch, update and remove Burp Suite with a managed Java runtime.

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use relay_core::paths::{HostEnv, resolve};
use relay_core::{Config, Error, Platform};
use relay_io::config_file;

mod commands;
mod display;

use commands::Context;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "RELAY_LOG";

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "A CLI for installing, launching and managing Burp Suite")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, short = 'c', global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Preview actions without executing them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print the plan as JSON instead of progress output
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install Burp Suite
    Install {
        /// Edition to install (professional, community)
        #[arg(long)]
        edition: Option<String>,

        /// Version to install (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Skip confirmation prompts
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Start Burp Suite with the configured runtime and JVM arguments
    Launch,

    /// Update Burp Suite to the configured version
    Update {
        /// Download even if the installed version is already current
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Uninstall Burp Suite. Configuration is preserved.
    Remove,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = config_file::load(&cli.config)?;

    if let Commands::Install {
        edition, version, ..
    } = &cli.command
    {
        apply_overrides(&mut config, edition.as_deref(), version.as_deref());
        config.validate()?;
    }

    init_logging(&config, cli.verbose);
    debug!(config = %cli.config.display(), "loaded configuration");

    let platform = Platform::current();
    let paths = resolve(
        config.layout.mode,
        &platform.os,
        &config.paths.hints(),
        &HostEnv::capture(),
    )?;
    debug!(?paths, %platform, "resolved paths");

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let ctx = Context {
        config,
        paths,
        platform,
        dry_run: cli.dry_run,
        json: cli.json,
        cancel,
    };

    match cli.command {
        Commands::Install { yes, .. } => commands::install::run(&ctx, yes).await,
        Commands::Launch => commands::launch::run(&ctx).await,
        Commands::Update { force } => commands::update::run(&ctx, force).await,
        Commands::Remove => commands::remove::run(&ctx).await,
    }
}

/// Apply `--edition` / `--version` on top of the config file.
fn apply_overrides(config: &mut Config, edition: Option<&str>, version: Option<&str>) {
    if let Some(edition) = edition.filter(|e| !e.trim().is_empty()) {
        config.product.edition = edition.trim().to_string();
    }
    if let Some(version) = version.filter(|v| !v.trim().is_empty()) {
        config.product.version = version.trim().to_string();
    }
}

/// Filter precedence: `RELAY_LOG`, then `-v`, then `logging.level`.
fn log_filter(env_directive: Option<&str>, verbose: bool, config: &Config) -> String {
    match env_directive.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => "debug".to_string(),
        None => config.logging.level.as_str().to_string(),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let env_directive = std::env::var(LOG_ENV).ok();
    let directive = log_filter(env_directive.as_deref(), verbose, config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });
}
