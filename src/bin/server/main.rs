use anyhow::{Context, Result};
use clap::Parser;
use feature_tracker::{
    adapters::{inbound::http::router::create_router, outbound::events::EventChannels},
    app::{AppBuilder, AppConfig, EventsConfig, PublisherMode, RepositoryBackend},
};
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "feature-tracker-server")]
#[command(about = "Product, release and feature tracking service", long_about = None)]
struct Cli {
    /// Server port to listen on
    #[arg(short, long, env = "SERVER_PORT", default_value = "8081")]
    port: u16,

    /// Server host to bind to
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Repository backend type
    #[arg(long, env = "REPOSITORY_BACKEND", default_value = "memory")]
    repository_backend: String,

    /// Database URL for repository backend (PostgreSQL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Channel receiving feature created events
    #[arg(long, env = "FT_EVENTS_NEW_FEATURES", default_value = "new_features")]
    events_new_features: String,

    /// Channel receiving feature updated events
    #[arg(long, env = "FT_EVENTS_UPDATED_FEATURES", default_value = "updated_features")]
    events_updated_features: String,

    /// Channel receiving feature deleted events
    #[arg(long, env = "FT_EVENTS_DELETED_FEATURES", default_value = "deleted_features")]
    events_deleted_features: String,

    /// Events publisher: dumb (log only) or broker
    #[arg(long, env = "FT_EVENTS_PUBLISHER", default_value = "dumb")]
    events_publisher: String,

    /// Broker REST proxy URL, required for the broker publisher
    #[arg(long, env = "FT_BROKER_URL")]
    broker_url: Option<String>,

    /// Seconds between outbox relay runs
    #[arg(long, env = "FT_OUTBOX_POLL_INTERVAL_SECS", default_value = "5")]
    outbox_poll_interval_secs: u64,

    /// Hours to keep delivered outbox records before purging them
    #[arg(long, env = "FT_OUTBOX_RETENTION_HOURS", default_value = "168")]
    outbox_retention_hours: u64,

    /// Header carrying the authenticated username
    #[arg(long, env = "FT_PRINCIPAL_HEADER", default_value = "x-auth-user")]
    principal_header: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn to_app_config(&self) -> Result<AppConfig> {
        let repository_backend = match self.repository_backend.as_str() {
            "memory" => RepositoryBackend::InMemory,
            "database" | "db" => {
                let connection_string = self
                    .database_url
                    .clone()
                    .context("DATABASE_URL is required for database backend")?;
                RepositoryBackend::Database { connection_string }
            }
            _ => anyhow::bail!("Unknown repository backend: {}", self.repository_backend),
        };

        let publisher: PublisherMode = self.events_publisher.parse()?;
        if publisher == PublisherMode::Broker && self.broker_url.is_none() {
            anyhow::bail!("FT_BROKER_URL is required for the broker events publisher");
        }

        Ok(AppConfig {
            repository_backend,
            events: EventsConfig {
                channels: EventChannels {
                    new_features: self.events_new_features.clone(),
                    updated_features: self.events_updated_features.clone(),
                    deleted_features: self.events_deleted_features.clone(),
                },
                publisher,
                broker_url: self.broker_url.clone(),
                outbox_poll_interval: Duration::from_secs(self.outbox_poll_interval_secs),
                outbox_retention: Duration::from_secs(self.outbox_retention_hours * 60 * 60),
            },
            principal_header: self.principal_header.clone(),
        })
    }

    fn init_logging(&self) -> Result<()> {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        };

        // RUST_LOG wins over --log-level when set
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", level)));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to initialize logging")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging()?;

    info!("Starting Feature Tracker Server");
    info!("Repository backend: {}", cli.repository_backend);
    info!("Events publisher: {}", cli.events_publisher);

    // Create app configuration
    let config = cli.to_app_config()?;

    // Build the application
    let app_services = AppBuilder::new()
        .with_config(config)
        .build()
        .await
        .context("Failed to build application")?;

    let router = create_router(app_services.app_state());

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    // Start the server
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    app_services.outbox_relay.abort();
    Ok(())
}
