use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glamlens::provider::SnapshotProvider;
use glamlens::{Config, Engine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "glamlens")]
#[command(
    author,
    version,
    about = "Classify mods and find which ones affect your character"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Captured provider state (JSON) to analyze
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify changed-item identifiers
    Classify {
        /// Identifiers, e.g. "Heavy Plate Helm" or "Customization: Viera Female Ears"
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Match a candidate mod name against the installed catalog
    Match {
        candidate: String,
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Show candidate mod names decoded from loaded resource trees
    Tree,

    /// List mods currently affecting the player
    Affecting {
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Check a mod for conflicts with other selected mods
    Conflicts {
        /// Mod directory to analyze
        #[arg(long = "mod")]
        mod_directory: String,
        /// Mod type (gear, hair, face, ...); classified from its items when omitted
        #[arg(short = 't', long = "type")]
        mod_type: Option<String>,
        /// Other selected mod directories
        #[arg(long, value_delimiter = ',')]
        selected: Vec<String>,
    },

    /// Replay the snapshot's lifecycle events into the mod cache
    Events,

    /// Manage the mod cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Manage saved designs
    Design {
        #[command(subcommand)]
        action: DesignCommands,
    },

    /// Apply option selections to a mod through the provider
    Apply {
        #[arg(short, long)]
        collection: Option<String>,
        #[arg(long = "mod")]
        mod_directory: String,
        /// GROUP=OPTION[,OPTION...]; repeatable
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached mod categories
    List,
    /// Reconcile the cache with the provider catalog
    Sync,
}

#[derive(Subcommand)]
enum DesignCommands {
    /// List saved designs
    List {
        #[arg(long)]
        character: Option<String>,
    },
    /// Import designs from a JSON file
    Import { path: PathBuf },
    /// Delete a design
    Delete { character: String, name: String },
    /// Apply the option selections of a design through the provider
    Apply {
        character: String,
        name: String,
        #[arg(short, long)]
        collection: Option<String>,
    },
}

impl Commands {
    fn needs_snapshot(&self) -> bool {
        !matches!(
            self,
            Commands::Classify { .. }
                | Commands::Cache {
                    action: CacheCommands::List
                }
                | Commands::Design {
                    action: DesignCommands::List { .. }
                        | DesignCommands::Import { .. }
                        | DesignCommands::Delete { .. }
                }
        )
    }
}

fn setup_logging(verbosity: u8, log_file: &Path) -> Result<()> {
    let filter = match verbosity {
        0 => "glamlens=warn",
        1 => "glamlens=info",
        2 => "glamlens=debug",
        _ => "glamlens=trace",
    };

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().await?;
    setup_logging(cli.verbose, &config.paths.log_file())?;

    let snapshot = match &cli.snapshot {
        Some(path) => SnapshotProvider::load(path).await?,
        None if cli.command.needs_snapshot() => {
            anyhow::bail!("This command needs provider data. Pass --snapshot <FILE>.")
        }
        None => SnapshotProvider::empty(),
    };
    let snapshot = Arc::new(snapshot);

    let engine = Engine::open(config, snapshot.clone())?;

    match cli.command {
        Commands::Classify { identifiers } => engine.cmd_classify(&identifiers)?,
        Commands::Match {
            candidate,
            collection,
        } => engine.cmd_match(&candidate, collection.as_deref())?,
        Commands::Tree => engine.cmd_tree()?,
        Commands::Affecting { collection } => engine.cmd_affecting(collection.as_deref())?,
        Commands::Conflicts {
            mod_directory,
            mod_type,
            selected,
        } => engine.cmd_conflicts(&mod_directory, mod_type.as_deref(), &selected)?,
        Commands::Events => engine.cmd_events(snapshot.events())?,
        Commands::Cache { action } => match action {
            CacheCommands::List => engine.cmd_cache_list()?,
            CacheCommands::Sync => engine.cmd_cache_sync()?,
        },
        Commands::Design { action } => match action {
            DesignCommands::List { character } => engine.cmd_design_list(character.as_deref())?,
            DesignCommands::Import { path } => engine.cmd_design_import(&path).await?,
            DesignCommands::Delete { character, name } => engine.cmd_design_delete(&character, &name)?,
            DesignCommands::Apply {
                character,
                name,
                collection,
            } => {
                engine
                    .cmd_apply_design(collection.as_deref(), &character, &name)
                    .await?
            }
        },
        Commands::Apply {
            collection,
            mod_directory,
            groups,
        } => {
            engine
                .cmd_apply(collection.as_deref(), &mod_directory, &groups)
                .await?
        }
    }

    Ok(())
}
