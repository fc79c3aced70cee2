use axum::http::HeaderName;
use sqlx::postgres::PgPoolOptions;
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    adapters::{
        inbound::http::router::{AppState, DEFAULT_PRINCIPAL_HEADER},
        outbound::{
            events::{
                BrokerEventPublisher, ConfiguredPublisher, EventChannels, LoggingEventPublisher,
                RestProxyTransport,
            },
            persistence::{InMemoryStore, SqlStore},
        },
    },
    ports::{
        events::BrokerTransport,
        repositories::TransactionManager,
        services::{FeatureService, ProductService, ReleaseService},
    },
    services::{
        ApplicationEventBus, EventDispatcher, FeatureServiceImpl, ProductServiceImpl,
        ReleaseServiceImpl,
    },
};

const DEFAULT_OUTBOX_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_OUTBOX_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub repository_backend: RepositoryBackend,
    pub events: EventsConfig,
    pub principal_header: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repository_backend: RepositoryBackend::InMemory,
            events: EventsConfig::default(),
            principal_header: DEFAULT_PRINCIPAL_HEADER.to_string(),
        }
    }
}

/// Repository backend configuration
#[derive(Debug, Clone)]
pub enum RepositoryBackend {
    InMemory,
    Database { connection_string: String },
}

/// Feature event publishing configuration
#[derive(Debug, Clone)]
pub struct EventsConfig {
    pub channels: EventChannels,
    pub publisher: PublisherMode,
    /// Base URL of the broker's REST proxy, required in `Broker` mode
    pub broker_url: Option<String>,
    pub outbox_poll_interval: Duration,
    /// How long delivered outbox records are kept
    pub outbox_retention: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channels: EventChannels::default(),
            publisher: PublisherMode::Dumb,
            broker_url: None,
            outbox_poll_interval: DEFAULT_OUTBOX_POLL_INTERVAL,
            outbox_retention: DEFAULT_OUTBOX_RETENTION,
        }
    }
}

/// Which publisher receives feature events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublisherMode {
    /// Log events only
    #[default]
    Dumb,
    /// Send events to the message broker
    Broker,
}

impl FromStr for PublisherMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dumb" => Ok(PublisherMode::Dumb),
            "broker" => Ok(PublisherMode::Broker),
            other => Err(AppError::Configuration {
                message: format!("Unknown events publisher '{}', expected DUMB or BROKER", other),
            }),
        }
    }
}

/// Application dependencies container
pub struct AppDependencies {
    pub transactions: Arc<dyn TransactionManager>,
    pub publisher: ConfiguredPublisher,
}

/// Application services container
pub struct AppServices {
    pub product_service: Arc<dyn ProductService>,
    pub release_service: Arc<dyn ReleaseService>,
    pub feature_service: Arc<dyn FeatureService>,
    pub dispatcher: Arc<EventDispatcher>,
    pub event_bus: ApplicationEventBus,
    pub principal_header: HeaderName,
    /// Background task delivering outbox records, started by [`AppBuilder::build`]
    pub outbox_relay: JoinHandle<()>,
}

impl AppServices {
    /// Router state sharing these services
    pub fn app_state(&self) -> AppState {
        AppState {
            product_service: self.product_service.clone(),
            release_service: self.release_service.clone(),
            feature_service: self.feature_service.clone(),
            principal_header: self.principal_header.clone(),
        }
    }
}

/// Application builder for dependency injection
pub struct AppBuilder {
    config: AppConfig,
    broker_transport: Option<Arc<dyn BrokerTransport>>,
}

impl AppBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            broker_transport: None,
        }
    }

    /// Configure the application with custom settings
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure repository backend
    pub fn with_repository_backend(mut self, backend: RepositoryBackend) -> Self {
        self.config.repository_backend = backend;
        self
    }

    /// Configure event publishing
    pub fn with_events(mut self, events: EventsConfig) -> Self {
        self.config.events = events;
        self
    }

    /// Use this transport in `Broker` mode instead of the REST proxy
    pub fn with_broker_transport(mut self, transport: Arc<dyn BrokerTransport>) -> Self {
        self.broker_transport = Some(transport);
        self
    }

    /// Build the application dependencies
    pub async fn build_dependencies(&self) -> Result<AppDependencies, AppError> {
        let transactions = self.create_store().await?;
        let publisher = self.create_publisher()?;

        Ok(AppDependencies {
            transactions,
            publisher,
        })
    }

    /// Build the complete application with services and start the outbox relay.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<AppServices, AppError> {
        let principal_header = HeaderName::from_str(&self.config.principal_header.to_ascii_lowercase())
            .map_err(|e| AppError::Configuration {
                message: format!(
                    "Invalid principal header '{}': {}",
                    self.config.principal_header, e
                ),
            })?;

        let deps = self.build_dependencies().await?;
        info!(publisher = deps.publisher.mode_name(), "Feature events publisher selected");

        let event_bus = ApplicationEventBus::new();
        let dispatcher = Arc::new(
            EventDispatcher::new(
                deps.transactions.clone(),
                Arc::new(deps.publisher),
                event_bus.clone(),
            )
            .with_retention(self.config.events.outbox_retention),
        );

        // Create services with dependency injection
        let product_service = Arc::new(ProductServiceImpl::new(deps.transactions.clone()));
        let release_service = Arc::new(ReleaseServiceImpl::new(deps.transactions.clone()));
        let feature_service = Arc::new(FeatureServiceImpl::new(
            deps.transactions.clone(),
            dispatcher.clone(),
        ));

        // The first tick also delivers anything left over from a previous run
        let outbox_relay = dispatcher
            .clone()
            .spawn_relay(self.config.events.outbox_poll_interval);

        Ok(AppServices {
            product_service,
            release_service,
            feature_service,
            dispatcher,
            event_bus,
            principal_header,
            outbox_relay,
        })
    }

    /// Create the transactional store based on configuration
    async fn create_store(&self) -> Result<Arc<dyn TransactionManager>, AppError> {
        match &self.config.repository_backend {
            RepositoryBackend::InMemory => Ok(Arc::new(InMemoryStore::new())),
            RepositoryBackend::Database { connection_string } => {
                let pool = PgPoolOptions::new()
                    .max_connections(DEFAULT_MAX_CONNECTIONS)
                    .connect(connection_string)
                    .await
                    .map_err(|e| AppError::RepositoryInit {
                        message: format!("Failed to connect to database: {}", e),
                    })?;

                let store = SqlStore::new(pool);
                store.migrate().await.map_err(|e| AppError::RepositoryInit {
                    message: format!("Failed to run migrations: {}", e),
                })?;

                Ok(Arc::new(store))
            }
        }
    }

    /// Create the event publisher selected by configuration
    fn create_publisher(&self) -> Result<ConfiguredPublisher, AppError> {
        let events = &self.config.events;
        match events.publisher {
            PublisherMode::Dumb => Ok(ConfiguredPublisher::NoOp(LoggingEventPublisher::new())),
            PublisherMode::Broker => {
                let transport = match (&self.broker_transport, &events.broker_url) {
                    (Some(transport), _) => transport.clone(),
                    (None, Some(url)) => {
                        let transport =
                            RestProxyTransport::new(url).map_err(|e| AppError::PublisherInit {
                                message: e.to_string(),
                            })?;
                        Arc::new(transport) as Arc<dyn BrokerTransport>
                    }
                    (None, None) => {
                        return Err(AppError::Configuration {
                            message: "A broker URL is required for the BROKER events publisher"
                                .to_string(),
                        });
                    }
                };

                Ok(ConfiguredPublisher::Broker(BrokerEventPublisher::new(
                    transport,
                    events.channels.clone(),
                )))
            }
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Repository initialization error: {message}")]
    RepositoryInit { message: String },

    #[error("Publisher initialization error: {message}")]
    PublisherInit { message: String },
}

/// Create an in-memory application for testing and development
pub async fn create_in_memory_app() -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_repository_backend(RepositoryBackend::InMemory)
        .build()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::events::InMemoryTransport;

    #[tokio::test]
    async fn test_create_in_memory_app() {
        let app = create_in_memory_app().await.unwrap();

        assert_eq!(app.principal_header.as_str(), "x-auth-user");
        assert!(!app.outbox_relay.is_finished());
        assert!(app.product_service.find_all_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broker_mode_requires_url() {
        let result = AppBuilder::new()
            .with_events(EventsConfig {
                publisher: PublisherMode::Broker,
                ..Default::default()
            })
            .build()
            .await;

        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_broker_mode_with_transport() {
        let deps = AppBuilder::new()
            .with_events(EventsConfig {
                publisher: PublisherMode::Broker,
                ..Default::default()
            })
            .with_broker_transport(Arc::new(InMemoryTransport::new()))
            .build_dependencies()
            .await
            .unwrap();

        assert_eq!(deps.publisher.mode_name(), "BROKER");
    }

    #[tokio::test]
    async fn test_invalid_principal_header() {
        let result = AppBuilder::new()
            .with_config(AppConfig {
                principal_header: "not a header".to_string(),
                ..Default::default()
            })
            .build()
            .await;

        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_publisher_mode_parsing() {
        assert_eq!("DUMB".parse::<PublisherMode>().unwrap(), PublisherMode::Dumb);
        assert_eq!("broker".parse::<PublisherMode>().unwrap(), PublisherMode::Broker);
        assert!("kafka".parse::<PublisherMode>().is_err());
    }
}
