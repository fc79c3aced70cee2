mod feature_repository;
mod outbox_repository;
mod product_repository;
mod release_repository;
mod transaction;

pub use feature_repository::FeatureRepository;
pub use outbox_repository::OutboxRepository;
pub use product_repository::ProductRepository;
pub use release_repository::ReleaseRepository;
pub use transaction::{complete, Transaction, TransactionManager, TransactionMode};
