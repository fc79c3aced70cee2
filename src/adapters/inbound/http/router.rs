use axum::{
    http::HeaderName,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    // Feature handlers
    create_feature,
    // Product handlers
    create_product,
    // Release handlers
    create_release,
    delete_feature,
    delete_release,
    get_feature,
    get_product,
    get_release,
    list_features,
    list_products,
    list_releases,
    update_feature,
    update_product,
    update_release,
};
use crate::ports::services::{FeatureService, ProductService, ReleaseService};

pub const DEFAULT_PRINCIPAL_HEADER: &str = "x-auth-user";

/// Application state containing all services
#[derive(Clone)]
pub struct AppState {
    pub product_service: Arc<dyn ProductService>,
    pub release_service: Arc<dyn ReleaseService>,
    pub feature_service: Arc<dyn FeatureService>,
    /// Header carrying the authenticated username
    pub principal_header: HeaderName,
}

/// Create the main application router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Products
        .route("/products", get(list_products).post(create_product))
        .route("/products/{code}", get(get_product).put(update_product))
        // Releases
        .route("/releases", get(list_releases).post(create_release))
        .route(
            "/releases/{code}",
            get(get_release).put(update_release).delete(delete_release),
        )
        // Features
        .route("/features", get(list_features).post(create_feature))
        .route(
            "/features/{code}",
            get(get_feature).put(update_feature).delete(delete_feature),
        )
}
