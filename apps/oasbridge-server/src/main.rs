mod config;
mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use oasbridge::{Api, RegisterOptions};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::{AppConfig, LoggingConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// oasbridge server - mounts `OpenAPI` documents as live HTTP services
#[derive(Parser)]
#[command(name = "oasbridge-server")]
#[command(about = "oasbridge server - mounts OpenAPI documents as live HTTP services")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and registered documents, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.config {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
    }

    // Layered config: defaults -> YAML (if provided) -> env (OASBRIDGE_*) -> CLI
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port);

    init_logging(&config.logging, cli.verbose);
    tracing::info!("oasbridge server starting");

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(&config).await,
        Commands::Check => check_config(&config),
    }
}

/// `RUST_LOG` wins, then `-v` repetition, then the configured level.
fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        1 => tracing_subscriber::EnvFilter::new("info"),
        2 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Registers every configured document on a fresh facade.
fn build_api(config: &AppConfig) -> Result<Api> {
    let mut api = Api::new();
    for entry in &config.apis {
        let mut options = RegisterOptions::new()
            .with_resolver(handlers::petstore_resolver())
            .with_debug(config.server.debug);
        if let Some(base) = &entry.base_path {
            options = options.with_base_path(base);
        }
        if let Some(arguments) = &entry.arguments {
            options = options.with_arguments(arguments.clone());
        }

        let registered = api.register(&entry.spec, options)?;
        tracing::info!(
            title = %registered.title,
            version = %registered.version,
            base_path = %registered.base_path,
            routes = registered.routes.len(),
            "Registered API document"
        );
    }
    Ok(api)
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let api = build_api(config)?;
    println!("Configuration is valid");
    for base in api.base_paths() {
        println!("  mounted: {base}");
    }
    Ok(())
}

async fn run_server(config: &AppConfig) -> Result<()> {
    let api = build_api(config)?;
    let swagger_url = api.swagger_url().map(str::to_owned);
    let router = api.into_router().layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.server.ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server bound on {}", addr);
    if let Some(url) = swagger_url {
        tracing::info!("Swagger console at http://{}{}", addr, url);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

/// Resolves when Ctrl+C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(%e, "Error handling Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                handler.recv().await;
            }
            Err(e) => {
                tracing::error!(%e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Shutdown signal received, initiating graceful shutdown");
}
