use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, StatusCode},
    Json,
};

use crate::{
    adapters::inbound::http::{
        dto::{
            api_error, validation_error, ApiError, CreateFeaturePayload, FeatureDto,
            FeaturesQuery, UpdateFeaturePayload,
        },
        middleware::CurrentUser,
        router::AppState,
    },
    domain::models::DeleteFeatureCommand,
};

use super::{location_of, missing_parameter, not_found};

/// Handle feature listing for a release
pub async fn list_features(
    State(app_state): State<AppState>,
    Query(query): Query<FeaturesQuery>,
) -> Result<Json<Vec<FeatureDto>>, ApiError> {
    let release_code = query
        .release_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| missing_parameter("releaseCode"))?;

    let features = app_state
        .feature_service
        .find_features(&release_code)
        .await
        .map_err(api_error)?;

    Ok(Json(features.into_iter().map(FeatureDto::from).collect()))
}

/// Handle feature lookup
pub async fn get_feature(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<FeatureDto>, ApiError> {
    app_state
        .feature_service
        .find_feature_by_code(&code)
        .await
        .map_err(api_error)?
        .map(|feature| Json(feature.into()))
        .ok_or_else(|| not_found("Feature", &code))
}

/// Handle feature creation
pub async fn create_feature(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<CreateFeaturePayload>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1]), ApiError> {
    let cmd = payload.into_command(username).map_err(validation_error)?;
    let code = cmd.code.to_string();

    app_state
        .feature_service
        .create_feature(cmd)
        .await
        .map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location_of(&uri, &code))],
    ))
}

/// Handle feature update
pub async fn update_feature(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<UpdateFeaturePayload>,
) -> Result<StatusCode, ApiError> {
    let cmd = payload
        .into_command(code, username)
        .map_err(validation_error)?;

    app_state
        .feature_service
        .update_feature(cmd)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::OK)
}

/// Handle feature deletion
pub async fn delete_feature(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
    CurrentUser(username): CurrentUser,
) -> Result<StatusCode, ApiError> {
    let feature_service = &app_state.feature_service;

    if !feature_service
        .is_feature_exists(&code)
        .await
        .map_err(api_error)?
    {
        return Err(not_found("Feature", &code));
    }

    let cmd = DeleteFeatureCommand {
        code,
        deleted_by: username,
    };
    feature_service.delete_feature(cmd).await.map_err(api_error)?;

    Ok(StatusCode::OK)
}
