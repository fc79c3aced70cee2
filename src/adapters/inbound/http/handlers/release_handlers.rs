use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, StatusCode},
    Json,
};

use crate::adapters::inbound::http::{
    dto::{
        api_error, validation_error, ApiError, CreateReleasePayload, ReleaseDto, ReleasesQuery,
        UpdateReleasePayload,
    },
    middleware::CurrentUser,
    router::AppState,
};

use super::{location_of, missing_parameter, not_found};

/// Handle release listing for a product
pub async fn list_releases(
    State(app_state): State<AppState>,
    Query(query): Query<ReleasesQuery>,
) -> Result<Json<Vec<ReleaseDto>>, ApiError> {
    let product_code = query
        .product_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| missing_parameter("productCode"))?;

    let releases = app_state
        .release_service
        .find_releases_by_product_code(&product_code)
        .await
        .map_err(api_error)?;

    Ok(Json(releases.into_iter().map(ReleaseDto::from).collect()))
}

/// Handle release lookup
pub async fn get_release(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReleaseDto>, ApiError> {
    app_state
        .release_service
        .find_release_by_code(&code)
        .await
        .map_err(api_error)?
        .map(|release| Json(release.into()))
        .ok_or_else(|| not_found("Release", &code))
}

/// Handle release creation
pub async fn create_release(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<CreateReleasePayload>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1]), ApiError> {
    let cmd = payload.into_command(username).map_err(validation_error)?;
    let code = cmd.code.to_string();

    app_state
        .release_service
        .create_release(cmd)
        .await
        .map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location_of(&uri, &code))],
    ))
}

/// Handle release update
pub async fn update_release(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<UpdateReleasePayload>,
) -> Result<StatusCode, ApiError> {
    let cmd = payload
        .into_command(code, username)
        .map_err(validation_error)?;

    app_state
        .release_service
        .update_release(cmd)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::OK)
}

/// Handle release deletion, removing its features as well
pub async fn delete_release(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    let release_service = &app_state.release_service;

    if !release_service
        .is_release_exists(&code)
        .await
        .map_err(api_error)?
    {
        return Err(not_found("Release", &code));
    }

    release_service
        .delete_release(&code)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::OK)
}
