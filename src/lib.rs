pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - core business entities and value objects
pub use domain::{
    // Value objects
    Code,
    // Models
    EventEnvelope,
    Feature,
    FeatureEvent,
    FeatureStatus,
    Product,
    Release,
    ReleaseStatus,
    // Errors
    TrackerError,
    TrackerResult,
    ValidationError,
};

// Port types - interfaces for external systems
pub use ports::{
    BrokerTransport,
    EventPublisher,
    // Service ports
    FeatureService,
    ProductService,
    ReleaseService,
    // Repository ports
    Transaction,
    TransactionManager,
};

// Service implementations - business logic
pub use services::{
    ApplicationEventBus, EventDispatcher, FeatureServiceImpl, ProductServiceImpl,
    ReleaseServiceImpl,
};

// Application factory and configuration
pub use app::{
    create_in_memory_app, AppBuilder, AppConfig, AppDependencies, AppError, AppServices,
    EventsConfig, PublisherMode, RepositoryBackend,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::{
    events::{BrokerEventPublisher, EventChannels, InMemoryTransport, RestProxyTransport},
    persistence::{InMemoryStore, SqlStore},
};

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        create_in_memory_app, AppBuilder, AppServices, Code, EventEnvelope, FeatureEvent,
        FeatureService, InMemoryStore, ProductService, ReleaseService, TrackerError,
        TrackerResult,
    };
}
