use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, StatusCode},
    Json,
};

use crate::adapters::inbound::http::{
    dto::{
        api_error, validation_error, ApiError, CreateProductPayload, ProductDto,
        UpdateProductPayload,
    },
    middleware::CurrentUser,
    router::AppState,
};

use super::location_of;

/// Handle product listing
pub async fn list_products(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    let products = app_state
        .product_service
        .find_all_products()
        .await
        .map_err(api_error)?;

    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// Handle product lookup
pub async fn get_product(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ProductDto>, ApiError> {
    app_state
        .product_service
        .find_product_by_code(&code)
        .await
        .map_err(api_error)?
        .map(|product| Json(product.into()))
        .ok_or_else(|| super::not_found("Product", &code))
}

/// Handle product creation
pub async fn create_product(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<CreateProductPayload>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1]), ApiError> {
    let cmd = payload.into_command(username).map_err(validation_error)?;
    let code = cmd.code.to_string();

    app_state
        .product_service
        .create_product(cmd)
        .await
        .map_err(api_error)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location_of(&uri, &code))],
    ))
}

/// Handle product update
pub async fn update_product(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
    CurrentUser(username): CurrentUser,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<StatusCode, ApiError> {
    let cmd = payload
        .into_command(code, username)
        .map_err(validation_error)?;

    app_state
        .product_service
        .update_product(cmd)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::OK)
}
