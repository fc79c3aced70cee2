use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::error;

use crate::domain::{
    errors::{TrackerError, ValidationError},
    models::{
        AuditInfo, CreateFeatureCommand, CreateProductCommand, CreateReleaseCommand,
        Feature, FeatureStatus, Product, Release, ReleaseStatus, UpdateFeatureCommand,
        UpdateProductCommand, UpdateReleaseCommand,
    },
    value_objects::{Code, MAX_CODE_LENGTH},
};

pub const MAX_TITLE_LENGTH: usize = 500;

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponseDto>);

// Inbound payloads. Required strings default to empty so that a missing field is
// reported as a validation error rather than a deserialization failure.

/// DTO for creating a product
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// DTO for updating a product
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// DTO for creating a release
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReleasePayload {
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub code: String,
    pub description: Option<String>,
}

/// DTO for updating a release
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReleasePayload {
    pub description: Option<String>,
    pub status: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
}

/// DTO for creating a feature
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeaturePayload {
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub release_code: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
}

/// DTO for updating a feature
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeaturePayload {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
}

/// Query for `GET /api/releases`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasesQuery {
    pub product_code: Option<String>,
}

/// Query for `GET /api/features`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesQuery {
    pub release_code: Option<String>,
}

// Outbound representations

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub disabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDto {
    pub id: i64,
    pub code: String,
    pub product_code: String,
    pub description: Option<String>,
    pub status: ReleaseStatus,
    pub released_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDto {
    pub id: i64,
    pub code: String,
    pub product_code: String,
    pub release_code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: FeatureStatus,
    pub assigned_to: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// DTO for error responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
    pub message: String,
    pub details: Option<HashMap<String, serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

// Payload validation

fn required_code(field: &str, value: String) -> Result<Code, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    let length = value.chars().count();
    if length > MAX_CODE_LENGTH {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            actual: length,
            max: MAX_CODE_LENGTH,
        });
    }
    Code::new(value)
}

fn required_text(field: &str, value: String, max: Option<usize>) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    if let Some(max) = max {
        let length = value.chars().count();
        if length > max {
            return Err(ValidationError::FieldTooLong {
                field: field.to_string(),
                actual: length,
                max,
            });
        }
    }
    Ok(value)
}

fn parse_status<T>(value: Option<String>) -> Result<Option<T>, ValidationError>
where
    T: FromStr<Err = ValidationError>,
{
    value.map(|s| s.trim().parse()).transpose()
}

impl CreateProductPayload {
    pub fn into_command(self, created_by: String) -> Result<CreateProductCommand, ValidationError> {
        Ok(CreateProductCommand {
            code: required_code("code", self.code)?,
            name: required_text("name", self.name, None)?,
            description: self.description,
            image_url: self.image_url,
            created_by,
        })
    }
}

impl UpdateProductPayload {
    pub fn into_command(
        self,
        code: String,
        updated_by: String,
    ) -> Result<UpdateProductCommand, ValidationError> {
        Ok(UpdateProductCommand {
            code,
            name: required_text("name", self.name, None)?,
            description: self.description,
            image_url: self.image_url,
            updated_by,
        })
    }
}

impl CreateReleasePayload {
    pub fn into_command(self, created_by: String) -> Result<CreateReleaseCommand, ValidationError> {
        Ok(CreateReleaseCommand {
            product_code: required_text("productCode", self.product_code, None)?,
            code: required_code("code", self.code)?,
            description: self.description,
            created_by,
        })
    }
}

impl UpdateReleasePayload {
    pub fn into_command(
        self,
        code: String,
        updated_by: String,
    ) -> Result<UpdateReleaseCommand, ValidationError> {
        Ok(UpdateReleaseCommand {
            code,
            description: self.description,
            status: parse_status(self.status)?,
            released_at: self.released_at,
            updated_by,
        })
    }
}

impl CreateFeaturePayload {
    pub fn into_command(self, created_by: String) -> Result<CreateFeatureCommand, ValidationError> {
        Ok(CreateFeatureCommand {
            product_code: required_text("productCode", self.product_code, None)?,
            release_code: required_text("releaseCode", self.release_code, None)?,
            code: required_code("code", self.code)?,
            title: required_text("title", self.title, Some(MAX_TITLE_LENGTH))?,
            description: self.description,
            assigned_to: self.assigned_to,
            created_by,
        })
    }
}

impl UpdateFeaturePayload {
    pub fn into_command(
        self,
        code: String,
        updated_by: String,
    ) -> Result<UpdateFeatureCommand, ValidationError> {
        Ok(UpdateFeatureCommand {
            code,
            title: required_text("title", self.title, Some(MAX_TITLE_LENGTH))?,
            description: self.description,
            status: parse_status(self.status)?,
            assigned_to: self.assigned_to,
            updated_by,
        })
    }
}

// Conversion implementations

fn audit_fields(
    audit: AuditInfo,
) -> (String, DateTime<Utc>, Option<String>, Option<DateTime<Utc>>) {
    (
        audit.created_by,
        audit.created_at,
        audit.updated_by,
        audit.updated_at,
    )
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        let (created_by, created_at, updated_by, updated_at) = audit_fields(product.audit);
        ProductDto {
            id: product.id,
            code: product.code.into(),
            name: product.name,
            description: product.description,
            image_url: product.image_url,
            disabled: product.disabled,
            created_by,
            created_at,
            updated_by,
            updated_at,
        }
    }
}

impl From<Release> for ReleaseDto {
    fn from(release: Release) -> Self {
        let (created_by, created_at, updated_by, updated_at) = audit_fields(release.audit);
        ReleaseDto {
            id: release.id,
            code: release.code.into(),
            product_code: release.product_code.into(),
            description: release.description,
            status: release.status,
            released_at: release.released_at,
            created_by,
            created_at,
            updated_by,
            updated_at,
        }
    }
}

impl From<Feature> for FeatureDto {
    fn from(feature: Feature) -> Self {
        let (created_by, created_at, updated_by, updated_at) = audit_fields(feature.audit);
        FeatureDto {
            id: feature.id,
            code: feature.code.into(),
            product_code: feature.product_code.into(),
            release_code: feature.release_code.into(),
            title: feature.title,
            description: feature.description,
            status: feature.status,
            assigned_to: feature.assigned_to,
            created_by,
            created_at,
            updated_by,
            updated_at,
        }
    }
}

impl From<&TrackerError> for StatusCode {
    fn from(error: &TrackerError) -> Self {
        match error {
            TrackerError::ProductNotFound { .. }
            | TrackerError::ReleaseNotFound { .. }
            | TrackerError::FeatureNotFound { .. } => StatusCode::NOT_FOUND,
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Conflict { .. } => StatusCode::CONFLICT,
            TrackerError::ReadOnlyTransaction
            | TrackerError::TransactionClosed
            | TrackerError::EventPublication { .. }
            | TrackerError::Infrastructure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Map a service error to its HTTP response
pub fn api_error(error: TrackerError) -> ApiError {
    let status = StatusCode::from(&error);
    if status.is_server_error() {
        error!(error = %error, status = status.as_u16(), "Request failed");
    }
    (status, Json(ErrorResponseDto::from_tracker_error(error)))
}

/// Map a payload validation failure to a 400 response
pub fn validation_error(error: ValidationError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponseDto::bad_request(&error.to_string())),
    )
}

// Error response helpers

impl ErrorResponseDto {
    pub fn from_tracker_error(error: TrackerError) -> Self {
        let mut details = HashMap::new();

        let error_name = match &error {
            TrackerError::ProductNotFound { code }
            | TrackerError::ReleaseNotFound { code }
            | TrackerError::FeatureNotFound { code } => {
                details.insert("code".to_string(), serde_json::Value::String(code.clone()));
                "NotFound"
            }
            TrackerError::Conflict { entity, code } => {
                details.insert(
                    "entity".to_string(),
                    serde_json::Value::String(entity.to_string()),
                );
                details.insert("code".to_string(), serde_json::Value::String(code.clone()));
                "Conflict"
            }
            TrackerError::Validation(_) => "BadRequest",
            _ => "InternalServerError",
        };

        // Server errors are logged by `api_error`; callers get a generic message
        let message = if StatusCode::from(&error).is_server_error() {
            "Internal server error".to_string()
        } else {
            error.to_string()
        };

        ErrorResponseDto {
            error: error_name.to_string(),
            message,
            details: if details.is_empty() {
                None
            } else {
                Some(details)
            },
            timestamp: Utc::now(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        ErrorResponseDto {
            error: "BadRequest".to_string(),
            message: message.to_string(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        ErrorResponseDto {
            error: "Unauthorized".to_string(),
            message: message.to_string(),
            details: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = TrackerError::FeatureNotFound {
            code: "F1".to_string(),
        };
        assert_eq!(StatusCode::from(&not_found), StatusCode::NOT_FOUND);

        let conflict = TrackerError::Conflict {
            entity: "Release",
            code: "R1".to_string(),
        };
        assert_eq!(StatusCode::from(&conflict), StatusCode::CONFLICT);

        let validation = TrackerError::from(ValidationError::EmptyCode);
        assert_eq!(StatusCode::from(&validation), StatusCode::BAD_REQUEST);

        let storage = TrackerError::infrastructure("connection reset");
        assert_eq!(StatusCode::from(&storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_server_errors_are_logged_but_hidden() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let (status, Json(body)) = tracing::subscriber::with_default(subscriber, || {
            api_error(TrackerError::infrastructure("connection reset"))
        });

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("connection reset"));
    }

    #[test]
    fn test_client_errors_are_not_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let (status, Json(body)) = tracing::subscriber::with_default(subscriber, || {
            api_error(TrackerError::FeatureNotFound {
                code: "F1".to_string(),
            })
        });

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.message.contains("F1"));
        assert!(logs.contents().is_empty());
    }

    #[test]
    fn test_create_feature_payload_validation() {
        let payload: CreateFeaturePayload = serde_json::from_value(serde_json::json!({
            "productCode": "intellij",
            "releaseCode": "IDEA-2023.3.8",
            "code": "F1",
            "title": "x".repeat(MAX_TITLE_LENGTH + 1),
        }))
        .unwrap();

        let err = payload.into_command("siva".to_string()).unwrap_err();
        assert!(matches!(err, ValidationError::FieldTooLong { max: MAX_TITLE_LENGTH, .. }));

        let payload: CreateFeaturePayload = serde_json::from_value(serde_json::json!({
            "releaseCode": "IDEA-2023.3.8",
            "code": "F1",
            "title": "Missing product",
        }))
        .unwrap();
        assert_eq!(
            payload.into_command("siva".to_string()).unwrap_err(),
            ValidationError::required("productCode")
        );
    }

    #[test]
    fn test_update_feature_payload_status() {
        let payload: UpdateFeaturePayload = serde_json::from_value(serde_json::json!({
            "title": "Renamed",
            "status": "IN_PROGRESS",
        }))
        .unwrap();
        let cmd = payload
            .into_command("F1".to_string(), "editor".to_string())
            .unwrap();
        assert_eq!(cmd.status, Some(FeatureStatus::InProgress));

        let payload: UpdateFeaturePayload = serde_json::from_value(serde_json::json!({
            "title": "Renamed",
            "status": "SHIPPED",
        }))
        .unwrap();
        assert!(matches!(
            payload.into_command("F1".to_string(), "editor".to_string()),
            Err(ValidationError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_code_length_is_checked() {
        let payload = CreateReleasePayload {
            product_code: "intellij".to_string(),
            code: "R".repeat(MAX_CODE_LENGTH + 1),
            description: None,
        };
        assert!(matches!(
            payload.into_command("admin".to_string()),
            Err(ValidationError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let dto = ErrorResponseDto::from_tracker_error(TrackerError::infrastructure(
            "password authentication failed",
        ));
        assert_eq!(dto.error, "InternalServerError");
        assert_eq!(dto.message, "Internal server error");
    }
}
