//! worklog-tracker - Voice channel work-log tracker
//!
//! Listens to Discord voice state changes, records time spent in project
//! channels, and serves aggregated statistics over HTTP. Without a bot token
//! only the statistics API runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use worklog_common::config::{load_toml_config, ConfigOverrides, TrackerConfig};
use worklog_common::db::init_database;
use worklog_tracker::directory::UserDirectory;
use worklog_tracker::discord::{DiscordAdapter, DiscordDirectory};
use worklog_tracker::presence::{event_channel, run_presence_worker, PresenceMachine};
use worklog_tracker::store::SqliteStore;
use worklog_tracker::{build_router, AppState};

/// Command-line arguments for worklog-tracker
#[derive(Parser, Debug)]
#[command(name = "worklog-tracker")]
#[command(about = "Tracks time spent in project voice channels")]
#[command(version)]
struct Args {
    /// TOML config file (default: platform config dir)
    #[arg(short, long, env = "WORKLOG_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "WORKLOG_DATABASE")]
    database: Option<PathBuf>,

    /// HTTP listen address (host:port)
    #[arg(long, env = "WORKLOG_BIND")]
    bind: Option<String>,

    /// Voice channel that ends tracking without starting new tracking
    #[arg(long, env = "WORKLOG_BREAK_CHANNEL")]
    break_channel: Option<String>,

    /// Discord bot token; voice tracking is disabled without it
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the tracker and statistics API (default)
    Serve,
    /// Register a voice channel as a project
    AddProject {
        /// Project display name
        #[arg(long)]
        name: String,
        /// Voice channel id representing the project
        #[arg(long)]
        channel_id: String,
    },
    /// List registered projects
    ListProjects,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config_path = loaded.as_ref().map(|l| l.path.clone());
    let overrides = ConfigOverrides {
        database_path: args.database,
        bind: args.bind,
        break_channel_id: args.break_channel,
        discord_token: args.discord_token,
    };
    let config = TrackerConfig::resolve(overrides, loaded.map(|l| l.config))
        .context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting worklog-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let store = SqliteStore::new(pool);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::AddProject { name, channel_id } => {
            let project = store
                .create_project(&name, &channel_id)
                .await
                .context("Failed to add project")?;
            println!("{}\t{}\t{}", project.id, project.channel_id, project.name);
            Ok(())
        }
        Command::ListProjects => {
            for project in store.list_projects().await? {
                println!("{}\t{}\t{}", project.id, project.channel_id, project.name);
            }
            Ok(())
        }
    }
}

async fn serve(config: TrackerConfig, store: SqliteStore) -> Result<()> {
    let directory: Option<Arc<dyn UserDirectory>> = match &config.discord_token {
        Some(token) => {
            start_tracking(token.clone(), &config.break_channel_id, &store);
            Some(Arc::new(DiscordDirectory::new(token)) as Arc<dyn UserDirectory>)
        }
        None => {
            warn!("DISCORD_TOKEN is not set. Voice tracking disabled, serving statistics only");
            None
        }
    };

    let tracking = directory.is_some();
    let app = build_router(AppState::new(store, directory).with_tracking(tracking));

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("worklog-tracker listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Spawn the presence worker and the Discord gateway adapter feeding it
fn start_tracking(token: String, break_channel_id: &str, store: &SqliteStore) {
    let machine = Arc::new(PresenceMachine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        break_channel_id,
    ));
    info!("Break channel: {}", machine.break_channel_id());

    let (events_tx, events_rx) = event_channel();
    tokio::spawn(run_presence_worker(machine, events_rx));

    tokio::spawn(async move {
        let adapter = DiscordAdapter::new(token);
        if let Err(e) = adapter.start(events_tx).await {
            error!("Discord adapter stopped: {:#}", e);
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
