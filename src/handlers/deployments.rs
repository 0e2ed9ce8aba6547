use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::deployments::{CreateDeployment, DeploymentView, UpdateDeployment},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn deployment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deployments).post(create_deployment))
        .route(
            "/:id",
            get(get_deployment)
                .patch(update_deployment)
                .delete(delete_deployment),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/deployments",
    params(ListParams),
    responses(
        (status = 200, description = "Deployments, with x-total-count", body = [DeploymentView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "deployments"
)]
pub async fn list_deployments(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.deployments.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/deployments",
    request_body = CreateDeployment,
    responses(
        (status = 201, description = "Deployment created; stock consumed", body = DeploymentView),
        (status = 400, description = "Malformed part key or release before deployment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "deployments"
)]
pub async fn create_deployment(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateDeployment>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .deployments
        .create(user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/deployments/{id}",
    params(("id" = String, Path, description = "Deployment ID")),
    responses(
        (status = 200, description = "Deployment with part name and brand", body = DeploymentView),
        (status = 404, description = "Deployment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "deployments"
)]
pub async fn get_deployment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deployment = state.services.deployments.get(parse_id(&id)?).await?;
    Ok(Json(deployment))
}

#[utoipa::path(
    patch,
    path = "/api/v1/deployments/{id}",
    params(("id" = String, Path, description = "Deployment ID")),
    request_body = UpdateDeployment,
    responses(
        (status = 200, description = "Deployment updated", body = DeploymentView),
        (status = 400, description = "Release before deployment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Deployment not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "deployments"
)]
pub async fn update_deployment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateDeployment>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .deployments
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/deployments/{id}",
    params(("id" = String, Path, description = "Deployment ID")),
    responses(
        (status = 200, description = "Deployment deleted; stock restored", body = DeletedResponse),
        (status = 404, description = "Deployment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "deployments"
)]
pub async fn delete_deployment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.deployments.delete(id).await?;
    Ok(deleted_response("Deployment", id))
}
