mod commands;
mod config;

use std::path::PathBuf;

use bedrock_world::{DirectorySource, World};
use clap::Parser;
use tracing::{debug, info};

use crate::commands::Command;
use crate::config::InspectConfig;

const DEFAULT_CONFIG: &str = "inspect.toml";

#[derive(Parser, Debug)]
#[command(name = "bedrock-inspect", version, about = "Query blocks in a Bedrock world save")]
struct Cli {
    /// Settings file; a missing default file is not an error
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// World folder, overriding the settings file
    #[arg(long, short)]
    world: Option<PathBuf>,
    /// Decode every sub-chunk up front
    #[arg(long)]
    eager: bool,
    #[command(subcommand)]
    command: Command,
}

fn load_config(cli: &Cli) -> Result<InspectConfig, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => InspectConfig::load(path),
        None if std::path::Path::new(DEFAULT_CONFIG).is_file() => InspectConfig::load(DEFAULT_CONFIG),
        None => Ok(InspectConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();

    let mut config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = cli.world.clone().or(config.world.path.take()) else {
        eprintln!("No world given: pass --world or set [world] path in {DEFAULT_CONFIG}");
        std::process::exit(2);
    };
    if cli.eager {
        config.options.eager_sub_chunks = true;
    }
    debug!(options = ?config.options, "decode options");

    info!(world = %path.display(), "opening world");
    let source = DirectorySource::new(&path);
    let mut world = match World::load(&source, config.options) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    match commands::run(&cli.command, &mut world) {
        Ok(out) => print!("{out}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }

    if world.is_error() {
        info!(errors = world.errors().len(), "world has decode errors");
    }
}
