use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    errors::ApiError,
    services::parts::{CreatePart, PartDetail, PartView, UpdatePart},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_parts).post(create_part))
        .route(
            "/:id",
            get(get_part)
                .patch(update_part)
                .delete(delete_part),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/parts",
    params(ListParams),
    responses(
        (status = 200, description = "Parts, with x-total-count", body = [PartView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "parts"
)]
pub async fn list_parts(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.parts.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/parts",
    request_body = CreatePart,
    responses(
        (status = 201, description = "Part created with zero stock", body = PartView),
        (status = 409, description = "Part already exists", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "parts"
)]
pub async fn create_part(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePart>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state.services.parts.create(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/parts/{id}",
    params(("id" = String, Path, description = "Part ID")),
    responses(
        (status = 200, description = "Part with its procurement and deployment history", body = PartDetail),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "parts"
)]
pub async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let part = state.services.parts.get(parse_id(&id)?).await?;
    Ok(Json(part))
}

#[utoipa::path(
    patch,
    path = "/api/v1/parts/{id}",
    params(("id" = String, Path, description = "Part ID")),
    request_body = UpdatePart,
    responses(
        (status = 200, description = "Part renamed", body = PartView),
        (status = 409, description = "Name and brand already taken", body = crate::errors::ErrorResponse),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "parts"
)]
pub async fn update_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdatePart>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .parts
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/parts/{id}",
    params(("id" = String, Path, description = "Part ID")),
    responses(
        (status = 200, description = "Part deleted", body = DeletedResponse),
        (status = 409, description = "Part still has procurements or deployments", body = crate::errors::ErrorResponse),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "parts"
)]
pub async fn delete_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.parts.delete(id).await?;
    Ok(deleted_response("Part", id))
}
