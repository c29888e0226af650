//! gshared — the global shares daemon.
//!
//! Loads the share hierarchy from the redb store, keeps the usage
//! distribution fresh in the background and answers classification and
//! ordering queries over HTTP.
//!
//! # Usage
//!
//! ```text
//! gshared seed --file shares.toml
//! gshared serve --config /etc/gshare/gshare.toml --port 8480
//! gshared show
//! gshared classify --source-label user --working-group AP_TOP
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gshare_core::{GshareConfig, TaskDescriptor, UNDEFINED_SHARE};
use gshare_engine::{AllocationTree, ShareEngine};
use gshare_store::{SeedFile, StateStore};

const DEFAULT_LOG_FILTER: &str = "info,gshared=debug,gshare=debug";

#[derive(Parser)]
#[command(name = "gshared", about = "Global shares daemon")]
struct Cli {
    /// Path to gshare.toml. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the store path from the config file.
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the refresh loop and the REST API.
    Serve {
        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Import shares and job statistics from a TOML seed file.
    Seed {
        #[arg(long)]
        file: PathBuf,

        /// Drop existing job statistics before importing.
        #[arg(long)]
        replace_stats: bool,
    },
    /// Print the normalized tree, its leaves and their current priority order.
    Show,
    /// Print the leaf share a task would be assigned to.
    Classify {
        #[arg(long, default_value = "")]
        source_label: String,
        #[arg(long, default_value = "")]
        working_group: String,
        #[arg(long, default_value = "")]
        campaign: String,
        #[arg(long, default_value = "")]
        processing_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(path) = cli.store_path {
        config.store.path = path;
    }

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.api.port = port;
            }
            run_serve(config).await
        }
        Command::Seed {
            file,
            replace_stats,
        } => run_seed(&config, &file, replace_stats),
        Command::Show => run_show(&config).await,
        Command::Classify {
            source_label,
            working_group,
            campaign,
            processing_type,
        } => {
            let task = TaskDescriptor {
                source_label,
                working_group,
                campaign,
                processing_type,
            };
            run_classify(&config, &task)
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GshareConfig> {
    match path {
        Some(path) => {
            let config = GshareConfig::from_file(path)?;
            info!(?path, "configuration loaded");
            Ok(config)
        }
        None => Ok(GshareConfig::default()),
    }
}

fn open_store(config: &GshareConfig) -> anyhow::Result<StateStore> {
    if let Some(dir) = config.store.path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let store = StateStore::open(&config.store.path)?;
    info!(path = ?config.store.path, "state store opened");
    Ok(store)
}

async fn run_serve(config: GshareConfig) -> anyhow::Result<()> {
    info!("gshare daemon starting");

    let store = open_store(&config)?;
    let engine = Arc::new(
        ShareEngine::initialize(&store, Arc::new(store.clone()), &config.engine).await?,
    );

    // ── Background refresh ─────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_engine = Arc::clone(&engine);
    let interval = config.engine.refresh_interval();
    let refresh_handle = tokio::spawn(async move {
        refresh_engine.run(interval, shutdown_rx).await;
    });

    // ── API server ─────────────────────────────────────────────

    let router = gshare_api::build_router(engine);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;
    let _ = refresh_handle.await;

    info!("gshare daemon stopped");
    Ok(())
}

fn run_seed(config: &GshareConfig, file: &Path, replace_stats: bool) -> anyhow::Result<()> {
    let seed = SeedFile::from_file(file)?;
    let store = open_store(config)?;
    let summary = store.import_seed(&seed, replace_stats)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_show(config: &GshareConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let engine = ShareEngine::initialize(&store, Arc::new(store.clone()), &config.engine).await?;
    let distribution = engine.distribution().await;

    print!("{}", engine.tree());
    println!();
    println!("leaves:");
    for leaf in engine.leaf_names() {
        let usage = distribution.get(&leaf).copied().unwrap_or_default();
        println!(
            "  {leaf}: queued {:.2}, executing {:.2}, pledged {:.2}",
            usage.queued, usage.executing, usage.pledged
        );
    }
    println!();
    println!("priority order:");
    for (rank, leaf) in engine.sorted_leaves(false).await.iter().enumerate() {
        println!("  {}. {leaf}", rank + 1);
    }
    Ok(())
}

fn run_classify(config: &GshareConfig, task: &TaskDescriptor) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let tree = AllocationTree::build(&store, config.engine.max_depth)?;
    let engine = ShareEngine::from_tree(tree, Arc::new(store));
    let share = engine.classify(task);
    println!("{share}");
    if share == UNDEFINED_SHARE {
        anyhow::bail!("no share matches the task");
    }
    Ok(())
}
