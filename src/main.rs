//! bucketfs command-line entry point.
//!
//! Assembles the configured pipeline and runs a one-shot command against it.
//! The mount dispatcher itself lives outside this binary.
//!
//! Usage:
//!   bucketfs summary
//!   bucketfs --config mount.toml check
//!   bucketfs ls / --depth -1

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bucketfs::composition::Pipeline;
use bucketfs::config::{Config, LoggingConfig};
use bucketfs::fs::{Depth, Entry};

/// Object-store filesystem client pipeline.
#[derive(Parser, Debug)]
#[command(name = "bucketfs")]
#[command(about = "Assemble and inspect an object-store filesystem pipeline")]
struct Cli {
    /// Configuration file; defaults to ./bucketfs.toml when present
    #[arg(short, long, env = "BUCKETFS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the assembled pipeline, outermost node first
    Summary,
    /// Check that the backend is reachable
    Check,
    /// List a path through the pipeline
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// 0 for the path itself, N levels, or negative for unlimited
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        depth: i32,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());
    let (plain, json) = if logging.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry().with(filter).with(plain).with(json).init();
}

fn format_entry(entry: &Entry) -> String {
    let kind = if entry.is_dir { 'd' } else { '-' };
    let tier = entry.tier.as_ref().map(|t| t.as_str()).unwrap_or("-");
    format!(
        "{} {:>12} {} {:<18} {}",
        kind,
        entry.size,
        entry.modified.format("%Y-%m-%d %H:%M:%S"),
        tier,
        entry.path
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };
    init_tracing(&config.logging);

    let pipeline = Pipeline::assemble(&config)?;
    let client = pipeline.client();

    match cli.command {
        Command::Summary => println!("{}", pipeline.summary()),
        Command::Check => {
            if !client.is_available().await? {
                bail!("backend '{}' is unreachable", config.backend.kind);
            }
            println!("ok");
        }
        Command::Ls { path, depth } => {
            let depth = Depth::from(depth);
            tracing::debug!(%path, %depth, "listing");
            for entry in client.ls(&path, depth).await? {
                println!("{}", format_entry(&entry));
            }
        }
    }

    Ok(())
}
