use crate::{errors::ApiError, services::client_portal::PortalDeployment, AppState};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::common::QueryParams;
use utoipa::IntoParams;

/// Public routes; nothing here requires a token.
pub fn client_portal_routes() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PortalSearch {
    /// Client name or plate number, matched case-insensitively
    #[serde(default)]
    pub query: String,
}

#[utoipa::path(
    get,
    path = "/clientPortal/search",
    params(PortalSearch),
    responses(
        (status = 200, description = "Matching jobs, newest first", body = [PortalDeployment]),
        (status = 400, description = "Blank query", body = crate::errors::ErrorResponse)
    ),
    tag = "client-portal"
)]
pub async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PortalSearch>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.services.client_portal.search(&params.query).await?;
    Ok(Json(rows))
}
