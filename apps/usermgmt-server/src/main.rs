use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbHandle};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};

use api_ingress::{ApiIngress, ApiIngressConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use user_management::{UserManagement, UserManagementConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const API_INGRESS: &str = "api_ingress";

/// User management server - user directory and activity log over HTTP
#[derive(Parser)]
#[command(name = "usermgmt-server")]
#[command(about = "User management server - user directory and activity log over HTTP")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("User management server starting");
    tracing::debug!(server = ?config.server, "Effective server configuration");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config).await,
    }
}

/// Validate and absolutize the configured DSN against `server.home_dir`.
fn resolve_dsn(config: &AppConfig) -> Result<String> {
    let db_config = config
        .database
        .as_ref()
        .context("Database configuration missing (set `database.url` or pass --mock)")?;

    let dsn = db_config.url.trim();
    db::detect_sqlite(dsn)?;

    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = PathBuf::from(&config.server.home_dir);
    Ok(db::absolutize_sqlite_dsn(dsn, &base_dir, true)?)
}

async fn connect_database(config: &AppConfig) -> Result<DbHandle> {
    let dsn = resolve_dsn(config)?;
    let (max_conns, busy_timeout_ms) = config
        .database
        .as_ref()
        .map(|db| (db.max_conns, db.busy_timeout_ms))
        .unwrap_or_default();

    let connect_opts = ConnectOpts {
        max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: busy_timeout_ms.map(|ms| Duration::from_millis(ms as u64)),
    };

    tracing::info!("Connecting to database: {}", dsn);
    let db = DbHandle::connect(&dsn, connect_opts)
        .await
        .with_context(|| format!("Failed to connect to '{dsn}'"))?;
    Ok(db)
}

fn bind_addr(config: &AppConfig, ingress: &ApiIngressConfig) -> String {
    if ingress.bind_addr.trim().is_empty() {
        format!("{}:{}", config.server.host, config.server.port)
    } else {
        ingress.bind_addr.trim().to_owned()
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let um_config: UserManagementConfig = config.module_config(UserManagement::NAME)?;
    let ingress_config: ApiIngressConfig = config.module_config(API_INGRESS)?;

    let db = connect_database(&config).await?;
    let conn = db.sea();

    let module = UserManagement::new();
    module.migrate(&conn).await?;
    module.init(conn, um_config).await?;

    let addr = bind_addr(&config, &ingress_config);
    let mut ingress = ApiIngress::new(ingress_config).with_openapi(UserManagement::openapi());
    if config.server.timeout_sec > 0 {
        ingress = ingress.with_request_timeout(Duration::from_secs(config.server.timeout_sec));
    }
    let router = ingress.build_router(module.register_rest(Router::new())?)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    let served = ingress.serve(router, &addr, cancel).await;
    db.close().await;
    tracing::info!("User management server stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    resolve_dsn(&config)?;
    let _: UserManagementConfig = config.module_config(UserManagement::NAME)?;
    let ingress: ApiIngressConfig = config.module_config(API_INGRESS)?;
    let addr = bind_addr(&config, &ingress);
    addr.parse::<std::net::SocketAddr>()
        .with_context(|| format!("Invalid bind address '{addr}'"))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
