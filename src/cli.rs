use std::path::{Path, PathBuf};

mod export;
mod import;
mod infer_mapping;
mod reconcile;

use anyhow::Context;
use clap::ArgAction;
use export::Export;
use import::Import;
use infer_mapping::InferMapping;
use reconcile::Reconcile;
use reqif_bridge::Config;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = "reqif-bridge.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(&self.config)?;
        self.command.run(&config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Build an interchange document from a requirements model
    Export(Export),

    /// Infer the import mapping of a document written by this tool
    InferMapping(InferMapping),

    /// Create requirements-model things from an interchange document
    Import(Import),

    /// Reconcile a value-set with rows of external cell values
    Reconcile(Reconcile),
}

impl Command {
    fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Export(command) => command.run(config)?,
            Self::InferMapping(command) => command.run()?,
            Self::Import(command) => command.run(config)?,
            Self::Reconcile(command) => command.run()?,
        }
        Ok(())
    }
}

/// Loads the configuration, falling back to the defaults if the file does
/// not exist.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        debug!("No configuration at {}; using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path).map_err(|e| anyhow::anyhow!(e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes `value` as pretty JSON to `path`, or to stdout if no path is given.
fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{content}"),
    }
    Ok(())
}
