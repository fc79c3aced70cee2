pub mod audit;
pub mod commands;
pub mod event;
pub mod feature;
pub mod product;
pub mod release;

pub use audit::AuditInfo;
pub use commands::*;
pub use event::{EventEnvelope, FeatureEvent, FeatureEventKind, OutboxRecord};
pub use feature::{Feature, FeatureStatus, NewFeature};
pub use product::{NewProduct, Product};
pub use release::{NewRelease, Release, ReleaseStatus};
