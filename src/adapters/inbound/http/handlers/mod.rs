use axum::{
    http::{StatusCode, Uri},
    Json,
};

use crate::adapters::inbound::http::dto::{ApiError, ErrorResponseDto};

pub mod feature_handlers;
pub mod product_handlers;
pub mod release_handlers;

pub use feature_handlers::*;
pub use product_handlers::*;
pub use release_handlers::*;

/// Location of a newly created resource under the collection that was posted to
fn location_of(collection: &Uri, code: &str) -> String {
    format!(
        "{}/{}",
        collection.path().trim_end_matches('/'),
        urlencoding::encode(code)
    )
}

fn not_found(entity: &str, code: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponseDto {
            error: "NotFound".to_string(),
            message: format!("{} with code '{}' not found", entity, code),
            details: None,
            timestamp: chrono::Utc::now(),
        }),
    )
}

fn missing_parameter(name: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponseDto::bad_request(&format!(
            "Required query parameter '{}' is missing",
            name
        ))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_of() {
        let uri: Uri = "/api/features".parse().unwrap();
        assert_eq!(location_of(&uri, "F1"), "/api/features/F1");

        let uri: Uri = "/api/releases/?x=1".parse().unwrap();
        assert_eq!(location_of(&uri, "R1"), "/api/releases/R1");
        assert_eq!(
            location_of(&uri, "IDEA 2024.1"),
            "/api/releases/IDEA%202024.1"
        );
        assert_eq!(
            location_of(&uri, "IDEA/2024.1"),
            "/api/releases/IDEA%2F2024.1"
        );
    }
}
