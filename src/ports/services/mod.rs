mod feature_service;
mod product_service;
mod release_service;

pub use feature_service::FeatureService;
pub use product_service::ProductService;
pub use release_service::ReleaseService;
