use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::procurements::{CreateProcurement, ProcurementView, UpdateProcurement},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn procurement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_procurements).post(create_procurement))
        .route(
            "/:id",
            get(get_procurement)
                .patch(update_procurement)
                .delete(delete_procurement),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/procurements",
    params(ListParams),
    responses(
        (status = 200, description = "Procurements, with x-total-count", body = [ProcurementView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurements"
)]
pub async fn list_procurements(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.procurements.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/procurements",
    request_body = CreateProcurement,
    responses(
        (status = 201, description = "Procurement created; part stock increased", body = ProcurementView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurements"
)]
pub async fn create_procurement(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateProcurement>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .procurements
        .create(user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/procurements/{id}",
    params(("id" = String, Path, description = "Procurement ID")),
    responses(
        (status = 200, description = "Procurement with part name and brand", body = ProcurementView),
        (status = 404, description = "Procurement not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurements"
)]
pub async fn get_procurement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let procurement = state.services.procurements.get(parse_id(&id)?).await?;
    Ok(Json(procurement))
}

#[utoipa::path(
    patch,
    path = "/api/v1/procurements/{id}",
    params(("id" = String, Path, description = "Procurement ID")),
    request_body = UpdateProcurement,
    responses(
        (status = 200, description = "Procurement updated; stock reconciled", body = ProcurementView),
        (status = 404, description = "Procurement not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 422, description = "Stock would go negative", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurements"
)]
pub async fn update_procurement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateProcurement>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .procurements
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/procurements/{id}",
    params(("id" = String, Path, description = "Procurement ID")),
    responses(
        (status = 200, description = "Procurement deleted; stock withdrawn", body = DeletedResponse),
        (status = 422, description = "Stock would go negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Procurement not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procurements"
)]
pub async fn delete_procurement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.procurements.delete(id).await?;
    Ok(deleted_response("Procurement", id))
}
