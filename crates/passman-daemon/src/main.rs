use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use passman_core::paths::{data_dir, ensure_private_dir};
use passman_core::settings::DaemonSettings;
use passman_core::{Dispatcher, VaultServer, VaultStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "passmand", author, version, about = "passman vault daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data directory and vault database, then exit
    Init {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Run the vault service in the foreground
    Run {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Socket to listen on (overrides settings and PASSMAN_SOCKET)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

struct Resolved {
    data: PathBuf,
    settings: DaemonSettings,
}

fn resolve(data_dir_override: Option<PathBuf>) -> Result<Resolved> {
    let data = match data_dir_override {
        Some(dir) => dir,
        None => data_dir()?,
    };
    ensure_private_dir(&data)
        .with_context(|| format!("cannot create data directory {}", data.display()))?;
    let settings = DaemonSettings::load(&data)?;
    Ok(Resolved { data, settings })
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("PASSMAN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { data_dir } => init_command(data_dir),
        Commands::Run { data_dir, socket } => run_command(data_dir, socket).await,
    }
}

fn init_command(data_dir_override: Option<PathBuf>) -> Result<()> {
    let Resolved { data, settings } = resolve(data_dir_override)?;
    let db_path = settings.database_path(&data);
    VaultStore::open(&db_path)
        .with_context(|| format!("cannot initialize vault at {}", db_path.display()))?;
    println!("Vault ready: {}", db_path.display());
    Ok(())
}

async fn run_command(data_dir_override: Option<PathBuf>, socket: Option<PathBuf>) -> Result<()> {
    let Resolved { data, settings } = resolve(data_dir_override)?;
    init_tracing(&settings.log_filter);

    let db_path = settings.database_path(&data);
    let store = match VaultStore::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "vault store unavailable");
            return Err(e).context("schema initialization failed");
        }
    };
    info!(path = %db_path.display(), "vault opened");

    let socket_path = socket.unwrap_or_else(|| settings.socket_path(&data));
    let server = VaultServer::new(socket_path, Arc::new(Dispatcher::new(store)));
    let listener = server
        .bind()
        .with_context(|| format!("cannot bind {}", server.socket_path().display()))?;

    info!("service started");
    let outcome = tokio::select! {
        res = server.serve(listener) => res.context("accept loop failed"),
        res = signal::ctrl_c() => res.context("signal handler failed"),
    };
    info!("service stopping");
    let _ = std::fs::remove_file(server.socket_path());
    outcome
}
