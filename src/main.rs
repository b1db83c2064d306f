use std::{net::SocketAddr, path::Path, sync::Arc};

use bookshelf::{
    AppState, CatalogMetrics, CatalogService, Credentials, GracefulShutdown, build_router,
    config::{
        ServerConfig, ServerConfigValidator, StorageConfig, loader::load_config,
        models::DEFAULT_CONFIG_TOML,
    },
    create_book_store, tracing_setup,
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the catalog server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config: ServerConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    ServerConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    tracing::info!("Loaded configuration from {config_path}");

    let store = create_book_store(&config.storage).context("Failed to open book store")?;
    match &config.storage {
        StorageConfig::Memory => tracing::info!("Using in-memory book store"),
        StorageConfig::Sqlite { path, .. } => {
            tracing::info!("Using SQLite book store at {path}")
        }
    }

    let metrics = Arc::new(
        CatalogMetrics::new(&config.metrics.duration_buckets)
            .context("Failed to initialize metrics")?,
    );
    let state = AppState::new(CatalogService::new(store), metrics);
    let app = build_router(state, Credentials::from_config(&config.auth));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    tracing::info!("bookshelf listening on {}", addr);

    let shutdown = graceful_shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received: {:?}", reason);
        })
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        return Err(eyre!("Configuration file '{config_path}' not found"));
    }

    let config = load_config(config_path)
        .await
        .with_context(|| format!("Configuration parsing failed for {config_path}"))?;
    println!("Configuration parsing: OK");

    ServerConfigValidator::validate(&config)
        .map_err(|e| eyre!("Configuration validation failed:\n{e}"))?;

    println!("Configuration validation: OK");
    println!();
    println!("Configuration Summary:");
    println!("   Listen Address: {}", config.listen_addr);
    println!("   Username: {}", config.auth.username);
    match &config.storage {
        StorageConfig::Memory => println!("   Storage: memory"),
        StorageConfig::Sqlite { path, .. } => println!("   Storage: sqlite ({path})"),
    }
    println!(
        "   Duration Buckets: {:?}",
        config.metrics.duration_buckets
    );
    Ok(())
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        return Err(eyre!("Configuration file '{config_path}' already exists"));
    }

    tokio::fs::write(path, DEFAULT_CONFIG_TOML)
        .await
        .context("Failed to write config file")?;
    println!("Created default configuration at: {config_path}");
    println!("   Run 'bookshelf serve --config {config_path}' to start the server");
    Ok(())
}
