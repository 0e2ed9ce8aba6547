use crate::{
    errors::{ApiError, ServiceError},
    services::forecasting::{Forecast, ForecastResource, PartUsage},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::common::QueryParams;
use std::str::FromStr;
use utoipa::IntoParams;

const DEFAULT_PERIODS: usize = 6;

pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/part-usage", get(part_usage))
        .route("/:resource", get(forecast))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastParams {
    /// Months to project, 1 to 24
    pub periods: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/forecast/{resource}",
    params(
        ("resource" = ForecastResource, Path, description = "sales, expenses or procurements"),
        ForecastParams
    ),
    responses(
        (status = 200, description = "Monthly history and projection", body = Forecast),
        (status = 400, description = "Unknown resource or periods out of range", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "forecast"
)]
pub async fn forecast(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    QueryParams(params): QueryParams<ForecastParams>,
) -> Result<impl IntoResponse, ApiError> {
    let resource = ForecastResource::from_str(&resource).map_err(|_| {
        ServiceError::BadRequest(format!(
            "unknown forecast resource '{}', expected sales, expenses or procurements",
            resource
        ))
    })?;
    let periods = params.periods.unwrap_or(DEFAULT_PERIODS);

    let forecast = state
        .services
        .forecasting
        .forecast(resource, periods)
        .await?;
    Ok(Json(forecast))
}

#[utoipa::path(
    get,
    path = "/api/v1/forecast/part-usage",
    responses(
        (status = 200, description = "Quantity used per part, highest first", body = [PartUsage]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "forecast"
)]
pub async fn part_usage(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let usage = state.services.forecasting.part_usage_totals().await?;
    Ok(Json(usage))
}
