pub mod events;
pub mod repositories;
pub mod services;

// Re-export all port traits for convenience
pub use events::{BrokerTransport, EventPublisher};
pub use repositories::{
    FeatureRepository, OutboxRepository, ProductRepository, ReleaseRepository, Transaction,
    TransactionManager, TransactionMode,
};
pub use services::{FeatureService, ProductService, ReleaseService};
