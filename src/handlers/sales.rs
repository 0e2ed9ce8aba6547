use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::sales::{CreateSale, SaleView, UpdateSale},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route(
            "/:id",
            get(get_sale)
                .patch(update_sale)
                .delete(delete_sale),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(ListParams),
    responses(
        (status = 200, description = "Sales, with x-total-count", body = [SaleView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.sales.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSale,
    responses(
        (status = 201, description = "Sale created; VAT computed", body = SaleView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn create_sale(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateSale>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .sales
        .create(user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = String, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale", body = SaleView),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state.services.sales.get(parse_id(&id)?).await?;
    Ok(Json(sale))
}

#[utoipa::path(
    patch,
    path = "/api/v1/sales/{id}",
    params(("id" = String, Path, description = "Sale ID")),
    request_body = UpdateSale,
    responses(
        (status = 200, description = "Sale updated", body = SaleView),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateSale>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .sales
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    params(("id" = String, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale deleted", body = DeletedResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sales"
)]
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.sales.delete(id).await?;
    Ok(deleted_response("Sale", id))
}
