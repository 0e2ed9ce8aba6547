use super::common::{
    created_response, deleted_response, list_query, list_response, parse_id, validate_input,
    DeletedResponse, JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::expenses::{CreateExpense, ExpenseView, UpdateExpense},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route(
            "/:id",
            get(get_expense)
                .patch(update_expense)
                .delete(delete_expense),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ListParams),
    responses(
        (status = 200, description = "Expenses, with x-total-count", body = [ExpenseView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (items, total) = state.services.expenses.list(&query).await?;
    Ok(list_response(items, total))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = CreateExpense,
    responses(
        (status = 201, description = "Expense created", body = ExpenseView),
        (status = 400, description = "Validation error or incomplete supplier details", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateExpense>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .expenses
        .create(user.user_id, payload)
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    params(("id" = String, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense", body = ExpenseView),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let expense = state.services.expenses.get(parse_id(&id)?).await?;
    Ok(Json(expense))
}

#[utoipa::path(
    patch,
    path = "/api/v1/expenses/{id}",
    params(("id" = String, Path, description = "Expense ID")),
    request_body = UpdateExpense,
    responses(
        (status = 200, description = "Expense updated", body = ExpenseView),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateExpense>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .expenses
        .update(parse_id(&id)?, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    params(("id" = String, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted", body = DeletedResponse),
        (status = 404, description = "Expense not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.services.expenses.delete(id).await?;
    Ok(deleted_response("Expense", id))
}
