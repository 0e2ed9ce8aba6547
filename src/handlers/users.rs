use super::common::{
    created_response, list_query, list_response, parse_id, success_response, validate_input,
    JsonBody, ListParams, QueryParams,
};
use crate::{
    auth::{auth_middleware, IssuedToken},
    errors::{ApiError, ServiceError},
    services::users::{LoginOrRegister, SetAllowed, UserDetail, UserView},
    AppState,
};
use axum::{
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use utoipa::ToSchema;

/// Sign-in (`POST /`) is the only route here that skips authentication.
pub fn user_routes(state: &AppState) -> Router<AppState> {
    let auth = || middleware::from_fn_with_state(state.auth.clone(), auth_middleware);
    Router::new()
        .route(
            "/",
            get(list_users)
                .route_layer(auth())
                .post(login_or_register),
        )
        .route(
            "/:id",
            get(get_user).patch(set_user_allowed).route_layer(auth()),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserView,
    pub token: IssuedToken,
}

/// Sign in, registering the account on first use
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = LoginOrRegister,
    responses(
        (status = 200, description = "Existing account signed in", body = LoginResponse),
        (status = 201, description = "Account registered and signed in", body = LoginResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account is not allowed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn login_or_register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginOrRegister>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (user, created) = state.services.users.login_or_register(payload).await?;
    if !user.is_allowed {
        info!(user_id = %user.id, "sign-in refused for disallowed account");
        return Err(ServiceError::Forbidden(format!(
            "{} is not allowed to sign in",
            user.email
        ))
        .into());
    }

    let token = state.auth.generate_token(&user).map_err(ServiceError::from)?;
    let body = LoginResponse {
        user: user.into(),
        token,
    };

    Ok(if created {
        created_response(body)
    } else {
        success_response(body)
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListParams),
    responses(
        (status = 200, description = "Users, with x-total-count", body = [UserView],
            headers(("x-total-count" = u64, description = "Filtered total"))
        ),
        (status = 400, description = "Invalid list query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = list_query(&state, &params)?;
    let (users, total) = state.services.users.list(&query).await?;
    Ok(list_response(users, total))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with owned properties", body = UserDetail),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.users.get(parse_id(&id)?).await?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = SetAllowed,
    responses(
        (status = 200, description = "Access updated", body = UserView),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn set_user_allowed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<SetAllowed>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .set_allowed(parse_id(&id)?, payload.is_allowed)
        .await?;
    Ok(Json(user))
}
