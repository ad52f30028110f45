mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use multiworld_registry::{LevelHost, LocalHost, WorldRegistry};
use serde::Serialize;
use settings::{DEFAULT_SETTINGS_FILE, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multiworld", about = "Manage the worlds of a game server")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and resolved settings
    Info,
    /// List registered worlds and their load state
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Register a new world
    Create {
        name: String,
        /// Also generate and load the level
        #[arg(long)]
        generate: bool,
    },
    /// Unload a world and delete its metadata and level folder
    Delete { name: String },
    /// Rescan metadata and load any worlds that are not loaded yet
    Reload,
}

#[derive(Debug, Serialize)]
struct WorldStatus {
    name: String,
    loaded: bool,
    generated: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let settings = Settings::load(&cli.config)?;

    if let Commands::Info = cli.command {
        println!("multiworld v{}", env!("CARGO_PKG_VERSION"));
        println!("settings: {}", cli.config.display());
        println!("data folder: {}", settings.data_folder.display());
        println!("levels root: {}", settings.levels_root().display());
        println!("default level: {}", settings.default_level);
        return Ok(());
    }

    let mut registry = start(&settings)?;
    let result = run(cli.command, &mut registry);
    registry.shutdown();
    result
}

/// Bring up the local host with its default level, then the registry.
fn start(settings: &Settings) -> anyhow::Result<WorldRegistry<LocalHost>> {
    let mut host = LocalHost::new(settings.levels_root());
    let default = settings.default_level.as_str();
    if settings.create_default_level {
        host.generate_level(default)
            .with_context(|| format!("failed to generate default level `{default}`"))?;
    }
    if host.is_level_generated(default) {
        host.load_level(default);
    } else {
        tracing::warn!(world = default, "default level does not exist");
    }
    Ok(WorldRegistry::init(&settings.data_folder, host))
}

fn run(command: Commands, registry: &mut WorldRegistry<LocalHost>) -> anyhow::Result<()> {
    match command {
        Commands::Info => {}
        Commands::List { json } => {
            let worlds = statuses(registry);
            if json {
                println!("{}", serde_json::to_string_pretty(&worlds)?);
            } else if worlds.is_empty() {
                println!("No worlds registered");
            } else {
                for w in &worlds {
                    let state = match (w.loaded, w.generated) {
                        (true, _) => "loaded",
                        (false, true) => "unloaded",
                        (false, false) => "missing",
                    };
                    println!("{:<24} {state}", w.name);
                }
            }
        }
        Commands::Create { name, generate } => {
            registry.create_world(&name)?;
            if generate {
                registry.host().generate_level(&name)?;
                registry.host_mut().load_level(&name);
            }
            println!("Created world {name}");
        }
        Commands::Delete { name } => {
            if !registry.delete_world(&name) {
                anyhow::bail!("could not delete world `{name}`");
            }
            println!("Deleted world {name}");
        }
        Commands::Reload => {
            let summary = registry.load_worlds();
            println!(
                "Reloaded: {} indexed, {} loaded, {} already loaded, {} missing, {} skipped, {} dropped",
                summary.indexed,
                summary.loaded,
                summary.already_loaded,
                summary.missing,
                summary.malformed + summary.mismatched + summary.failed,
                summary.vanished
            );
        }
    }
    Ok(())
}

fn statuses(registry: &WorldRegistry<LocalHost>) -> Vec<WorldStatus> {
    registry
        .get_worlds()
        .into_iter()
        .map(|name| WorldStatus {
            loaded: registry.host().is_level_loaded(name.as_str()),
            generated: registry.host().is_level_generated(name.as_str()),
            name: name.into(),
        })
        .collect()
}
