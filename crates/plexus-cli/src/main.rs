//! Plexus CLI - operator entry point for the orchestration daemon.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. `--config` file
//! 3. Default values (lowest priority)
//!
//! Logging verbosity follows `--debug` > `--verbose` > `RUST_LOG` >
//! default `warn`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plexus_capability::ProfileStore;
use plexus_daemon::config::DaemonConfig;
use plexus_daemon::transform::RuleSet;
use plexus_daemon::Daemon;
use plexus_event::Event;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Plexus - agent orchestration daemon.
#[derive(Parser, Debug)]
#[command(name = "plexus")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Daemon configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emit one event through the pipeline and print the results
    Emit {
        /// Event name, `namespace:verb`
        event: String,

        /// JSON payload (defaults to `{}`)
        payload: Option<String>,

        /// Wait for the async chain keyed by the event's correlation id
        #[arg(long)]
        wait: bool,

        /// Wait timeout in seconds
        #[arg(long, value_name = "SECS", requires = "wait")]
        timeout: Option<u64>,
    },

    /// Validate transformer rule files without loading a daemon
    Check {
        /// Rule files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show what the configured daemon would register
    Show,

    /// List capability profiles found in the configured directories
    Profiles,
}

fn load_config(args: &Args) -> Result<DaemonConfig> {
    let mut config = DaemonConfig::default();
    if let Some(ref path) = args.config {
        let overlay = DaemonConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        config.merge(&overlay);
        debug!(path = %path.display(), "Loaded config file");
    }
    Ok(config)
}

fn build_daemon(args: &Args) -> Result<Daemon> {
    let daemon = Daemon::builder()
        .config(load_config(args)?)
        .build()
        .context("failed to build daemon")?;
    Ok(daemon)
}

async fn cmd_emit(
    args: &Args,
    event: &str,
    payload: Option<&str>,
    wait: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let payload: Value = match payload {
        Some(raw) => serde_json::from_str(raw).context("payload is not valid JSON")?,
        None => json!({}),
    };

    let daemon = build_daemon(args)?;
    let event = Event::new(event, payload);
    let correlation_id = event.context.correlation_id;

    let results = daemon.emit(event).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    if wait {
        let ttl = timeout.map(Duration::from_secs);
        let downstream = daemon.wait_response(correlation_id, ttl).await?;
        println!("{}", serde_json::to_string_pretty(&downstream)?);
    }
    Ok(())
}

fn cmd_check(files: &[PathBuf]) -> Result<()> {
    let mut failures = 0usize;
    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        match RuleSet::from_toml(&content) {
            Ok(set) => {
                let errors = set.validate_all();
                if errors.is_empty() {
                    println!("{}: ok ({} rules)", path.display(), set.transformers.len());
                } else {
                    failures += errors.len();
                    for error in errors {
                        println!("{}: {error}", path.display());
                    }
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: parse error: {e}", path.display());
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} invalid rule(s)");
    }
    Ok(())
}

fn cmd_show(args: &Args) -> Result<()> {
    let daemon = build_daemon(args)?;
    let discovery = daemon.discovery();

    println!("Transformers:");
    for rule in discovery.transformers() {
        println!(
            "  {} {} -> {} (priority {})",
            rule.id,
            rule.source,
            rule.targets.join(", "),
            rule.priority
        );
    }
    println!("Profiles:");
    for name in discovery.profiles() {
        println!("  {name}");
    }
    Ok(())
}

fn cmd_profiles(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    if config.profiles.dirs.is_empty() {
        println!("No profile directories configured");
        return Ok(());
    }
    let store = ProfileStore::with_dirs(config.profiles.dirs.clone());
    for entry in store.list() {
        println!("{} ({})", entry.name, entry.path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    match args.command {
        Command::Emit {
            ref event,
            ref payload,
            wait,
            timeout,
        } => cmd_emit(&args, event, payload.as_deref(), wait, timeout).await,
        Command::Check { ref files } => cmd_check(files),
        Command::Show => cmd_show(&args),
        Command::Profiles => cmd_profiles(&args),
    }
}
