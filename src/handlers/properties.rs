use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::properties::{CreateProperty, PropertyDetail, PropertyView, UpdateProperty},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn property_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_properties).post(create_property))
        .route(
            "/:id",
            get(get_property)
                .patch(update_property)
                .delete(delete_property),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/properties",
    params(ListParams),
    responses(
        (status = 200, description = "Properties, with x-total-count", body = [PropertyView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "properties"
)]
pub async fn list_properties(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.properties.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/properties",
    request_body = CreateProperty,
    responses(
        (status = 201, description = "Property created", body = PropertyView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "properties"
)]
pub async fn create_property(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateProperty>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .properties
        .create(user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/properties/{id}",
    params(("id" = String, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property with its creator", body = PropertyDetail),
        (status = 404, description = "Property not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "properties"
)]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let property = state.services.properties.get(parse_id(&id)?).await?;
    Ok(Json(property))
}

#[utoipa::path(
    patch,
    path = "/api/v1/properties/{id}",
    params(("id" = String, Path, description = "Property ID")),
    request_body = UpdateProperty,
    responses(
        (status = 200, description = "Property updated", body = PropertyView),
        (status = 404, description = "Property not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "properties"
)]
pub async fn update_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateProperty>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .properties
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/properties/{id}",
    params(("id" = String, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property deleted", body = DeletedResponse),
        (status = 404, description = "Property not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "properties"
)]
pub async fn delete_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.properties.delete(id).await?;
    Ok(deleted_response("Property", id))
}
