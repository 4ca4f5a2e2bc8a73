//! # mediascan
//!
//! Media discovery daemon and admin CLI.
//!
//! `mediascan serve` replays a walk over every registered root at startup and
//! then keeps logging discoveries until interrupted. The other subcommands
//! manage the watched-root registry; `add` and `rescan` walk the affected
//! root before returning.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediascan_core::database::{
    InMemoryWatchedRootStore, PostgresWatchedRootStore, WatchedRootStore,
};
use mediascan_server::{
    app::AppContext,
    config::{Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions},
    listener::spawn_discovery_logger,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "mediascan")]
#[command(about = "Registers media library roots and announces every file found under them")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct GlobalArgs {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before the environment is read
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Keep watched roots in memory instead of PostgreSQL
    #[arg(long, global = true, env = "MEDIASCAN_EPHEMERAL", default_value_t = false)]
    ephemeral: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rescan every registered root, then log discoveries until Ctrl-C
    Serve,
    /// Register a root and walk it
    Add {
        /// Absolute path of the directory to watch
        path: PathBuf,
    },
    /// Print the registered roots
    List {
        /// Print JSON instead of one path per line
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Unregister a root
    Remove {
        /// Path as it was registered
        path: PathBuf,
    },
    /// Walk one registered root, or all of them
    Rescan {
        /// Registered root to walk; every root when omitted
        path: Option<PathBuf>,
    },
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.global)?;

    let admin = match cli.command.unwrap_or(Command::Serve) {
        Command::Db(DbCommand::Migrate) => return run_db_migrate(&config).await,
        Command::Serve => return run_server(&cli.global, &config).await,
        Command::Add { path } => Admin::Add(absolute(path)?),
        Command::List { json } => Admin::List { json },
        Command::Remove { path } => Admin::Remove(absolute(path)?),
        Command::Rescan { path } => Admin::Rescan(path.map(absolute).transpose()?),
    };
    run_admin(admin, &cli.global, &config).await
}

/// One-shot registry operations.
#[derive(Debug)]
enum Admin {
    Add(PathBuf),
    List { json: bool },
    Remove(PathBuf),
    Rescan(Option<PathBuf>),
}

/// Roots are stored absolute; resolve what the shell handed us.
fn absolute(path: PathBuf) -> anyhow::Result<PathBuf> {
    std::path::absolute(&path).with_context(|| format!("invalid path {}", path.display()))
}

fn load_runtime_config(args: &GlobalArgs) -> anyhow::Result<Config> {
    let ConfigLoad { config, warnings } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in &warnings {
        warn!(message = %warning, "configuration warning");
    }

    Ok(config)
}

async fn open_store(
    args: &GlobalArgs,
    config: &Config,
) -> anyhow::Result<Arc<dyn WatchedRootStore>> {
    if args.ephemeral {
        warn!("ephemeral mode: watched roots are kept in memory and lost on exit");
        return Ok(Arc::new(InMemoryWatchedRootStore::new()));
    }

    let database_url = config.database_url()?;
    let store = PostgresWatchedRootStore::connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    store
        .migrate()
        .await
        .context("database migration failed")?;
    Ok(Arc::new(store))
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let store = PostgresWatchedRootStore::connect(config.database_url()?)
        .await
        .context("failed to connect to PostgreSQL for migration")?;
    store
        .migrate()
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(args: &GlobalArgs, config: &Config) -> anyhow::Result<()> {
    let app = AppContext::new(config, open_store(args, config).await?);
    let listener_cancel = CancellationToken::new();
    let listener = spawn_discovery_logger(app.bus.subscribe(), listener_cancel.clone());

    let lifecycle = app.lifecycle();

    tokio::select! {
        failed = lifecycle.run_startup() => {
            if failed > 0 {
                warn!(failed, "startup completed with failed hooks");
            }
            info!("mediascan ready; press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutdown requested during startup");
        }
    }

    app.shutdown();
    listener_cancel.cancel();
    let seen = listener.await.context("discovery listener panicked")?;
    info!(discovered = seen, "mediascan stopped");
    Ok(())
}

async fn run_admin(admin: Admin, args: &GlobalArgs, config: &Config) -> anyhow::Result<()> {
    let app = AppContext::new(config, open_store(args, config).await?);
    let listener_cancel = CancellationToken::new();
    let listener = spawn_discovery_logger(app.bus.subscribe(), listener_cancel.clone());

    let outcome = async {
        match admin {
            Admin::Add(path) => {
                let root = app
                    .registry
                    .add_root(path)
                    .await
                    .context("failed to register root")?;
                println!("registered {}", root.path.display());
            }
            Admin::List { json } => {
                let roots = app.registry.list_roots().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&roots)?);
                } else {
                    for root in roots {
                        println!("{}\t{}", root.path.display(), root.created_at.to_rfc3339());
                    }
                }
            }
            Admin::Remove(path) => {
                app.registry
                    .remove_root(&path)
                    .await
                    .context("failed to remove root")?;
                println!("removed {}", path.display());
            }
            Admin::Rescan(Some(path)) => {
                let summary = app
                    .registry
                    .rescan_root(&path)
                    .await
                    .context("failed to rescan root")?;
                println!(
                    "{}: {} files, {} unreadable",
                    path.display(),
                    summary.files_announced,
                    summary.failed_paths.len()
                );
            }
            Admin::Rescan(None) => {
                let summary = app.rescanner.rescan_all().await;
                if summary.registry_unavailable {
                    anyhow::bail!("watched roots could not be enumerated");
                }
                println!(
                    "{} roots: {} files, {} unreadable",
                    summary.roots,
                    summary.walk.files_announced,
                    summary.walk.failed_paths.len()
                );
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    listener_cancel.cancel();
    listener.await.context("discovery listener panicked")?;
    outcome
}
