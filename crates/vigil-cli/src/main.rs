//! Vigil CLI - host for the observability pipeline engine.
//!
//! # Configuration
//!
//! Configuration is loaded with priority:
//!
//! 1. Environment variables (`AGENT_*`, highest)
//! 2. Configuration file (TOML, `--config` or `./vigil.toml`)
//! 3. Default values
//!
//! # Exit codes
//!
//! 0 on clean shutdown, 1 on unrecoverable startup or shutdown failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use vigil_plugins::register_builtin_plugins;
use vigil_runtime::{ConfigLoader, Engine, FrameworkConfig};

/// Default configuration file looked up when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "vigil.toml";

/// Vigil - modular observability and automation pipeline
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the engine and run until interrupted
    Start {
        /// Configuration file (defaults to ./vigil.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore any configuration file; environment and defaults only
        #[arg(long, conflicts_with = "config")]
        env: bool,
    },

    /// Create, validate, or display configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Probe a running engine's liveness endpoint
    Health {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 9090)]
        port: u16,
        /// Request timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },

    /// Fetch a running engine's status snapshot
    Status {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 9090)]
        port: u16,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write an example configuration file
    Create {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
    /// Load and validate a configuration file
    Validate {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Print the merged configuration (file + environment)
    Show {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Start { config, env } => cmd_start(config, env).await,
        Commands::Config { action } => match action {
            ConfigAction::Create { output } => cmd_config_create(&output),
            ConfigAction::Validate { config } => cmd_config_validate(&config),
            ConfigAction::Show { config } => cmd_config_show(config),
        },
        Commands::Health {
            host,
            port,
            timeout,
        } => cmd_health(&host, port, timeout).await,
        Commands::Status { host, port } => cmd_status(&host, port).await,
        Commands::Version => {
            println!("vigil {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Resolves the effective loader for `start` and `config show`.
fn loader_for(config: Option<PathBuf>, env_only: bool) -> Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if env_only {
        return Ok(loader);
    }
    match config {
        Some(path) => loader = loader.with_path(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                loader = loader.with_path(default);
            }
        }
    }
    Ok(loader)
}

async fn cmd_start(config: Option<PathBuf>, env_only: bool) -> Result<()> {
    let config = loader_for(config, env_only)?
        .load()
        .context("failed to load configuration")?;

    let engine = Engine::new(config).context("failed to create engine")?;
    register_builtin_plugins(engine.factory());

    // Configuration and validation failures halt startup.
    for spec in &engine.config().plugins {
        if !spec.enabled {
            info!(plugin = %spec.name, "skipping disabled plugin");
            continue;
        }
        engine
            .load_plugin_from_config(spec)
            .with_context(|| format!("failed to load plugin {}", spec.name))?;
    }

    engine.start().await.context("failed to start engine")?;
    info!("engine running; press ctrl-c to stop");

    wait_for_shutdown_signal().await;

    engine.stop().await.context("failed to stop engine")?;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}

fn cmd_config_create(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("refusing to overwrite existing file {}", output.display());
    }
    let config = FrameworkConfig::example();
    std::fs::write(output, config.to_toml()?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("wrote example configuration to {}", output.display());
    Ok(())
}

fn cmd_config_validate(path: &Path) -> Result<()> {
    ConfigLoader::new()
        .with_path(path)
        .skip_env_vars()
        .load()
        .with_context(|| format!("{} is not a valid configuration", path.display()))?;
    println!("{} is valid", path.display());
    Ok(())
}

fn cmd_config_show(config: Option<PathBuf>) -> Result<()> {
    let config = loader_for(config, false)?
        .load()
        .context("failed to load configuration")?;
    print!("{}", config.to_toml()?);
    Ok(())
}

async fn cmd_health(host: &str, port: u16, timeout: u64) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    let url = format!("http://{host}:{port}/health");
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    println!("{status}: {body}");
    if !status.is_success() {
        bail!("engine is not healthy");
    }
    Ok(())
}

async fn cmd_status(host: &str, port: u16) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let url = format!("http://{host}:{port}/status");
    let status: serde_json::Value = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?
        .json()
        .await
        .context("status endpoint returned malformed JSON")?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
