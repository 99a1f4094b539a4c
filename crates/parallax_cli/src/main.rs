//! Parallax CLI
//!
//! Play back scripted scroll sessions against a headless page and inspect
//! the effective configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parallax_core::ParallaxConfig;

mod page;
mod simulate;

use page::PageDescription;

#[derive(Parser)]
#[command(name = "parallax")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scroll-driven parallax simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play back a page description and print layer offsets after each step
    Simulate {
        /// Page description (TOML)
        page: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON object per step instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate and print the effective configuration
    Config {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate { page, config, json } => cmd_simulate(&page, config.as_deref(), json),
        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ParallaxConfig> {
    let config = match path {
        Some(path) => ParallaxConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ParallaxConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn cmd_simulate(page: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let description = PageDescription::load(page)?;
    info!(
        "Simulating {} ({} sections, {} steps)",
        page.display(),
        description.sections.len(),
        description.steps.len()
    );

    let snapshots = simulate::run(&description, config)?;

    if json {
        for snapshot in &snapshots {
            println!("{}", serde_json::to_string(snapshot)?);
        }
    } else {
        print!("{}", simulate::render_table(&snapshots));
    }
    Ok(())
}

fn cmd_config(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
