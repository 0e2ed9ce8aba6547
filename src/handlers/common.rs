use crate::{
    errors::{ApiError, ServiceError},
    services::listing::ListQuery,
    AppState,
};
use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Header carrying the filtered row count of a list response
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// JSON array body plus `x-total-count`
pub fn list_response<T: Serialize>(items: Vec<T>, total: u64) -> Response {
    let mut response = (StatusCode::OK, Json(items)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(TOTAL_COUNT_HEADER),
        HeaderValue::from(total),
    );
    response
}

/// JSON request body whose rejections render as a 400 `ErrorResponse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor with the same error shape as [`JsonBody`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait::async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Parses a path id, rejecting anything that is not a UUID.
pub fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::InvalidId(raw.to_string()))
}

/// Builds the list window from raw query parameters using configured page sizes.
pub fn list_query(state: &AppState, params: &HashMap<String, String>) -> Result<ListQuery, ApiError> {
    Ok(ListQuery::from_params(
        params,
        state.config.default_page_size,
        state.config.max_page_size,
    )?)
}

/// List parameters understood by every collection endpoint. Any
/// `<field>_like=value` pair adds a case-insensitive substring filter.
#[derive(Debug, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// First row, zero based
    #[serde(rename = "_start")]
    pub start: Option<u64>,
    /// One past the last row
    #[serde(rename = "_end")]
    pub end: Option<u64>,
    /// Field to sort by
    #[serde(rename = "_sort")]
    pub sort: Option<String>,
    /// `asc` or `desc`
    #[serde(rename = "_order")]
    pub order: Option<String>,
}

/// Body returned by delete endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub message: String,
}

pub fn deleted_response(kind: &str, id: Uuid) -> Response {
    success_response(DeletedResponse {
        id,
        message: format!("{} deleted", kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn list_response_sets_total_header() {
        let response = list_response(vec![1, 2, 3], 42);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "42");
    }

    #[test]
    fn malformed_ids_are_invalid() {
        assert_matches!(parse_id("not-a-uuid"), Err(ServiceError::InvalidId(_)));
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[derive(Debug, Deserialize)]
    struct Amount {
        #[allow(dead_code)]
        amount: f64,
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        for (content_type, body) in [
            ("application/json", r#"{"amount": "lots"}"#),
            ("application/json", "{"),
            ("text/plain", r#"{"amount": 1}"#),
        ] {
            let req = axum::http::Request::builder()
                .header("content-type", content_type)
                .body(axum::body::Body::from(body))
                .unwrap();
            let rejection = JsonBody::<Amount>::from_request(req, &()).await.unwrap_err();
            assert_matches!(rejection, ApiError::BadRequest(_), "{}", body);
            assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn bad_query_strings_are_bad_requests() {
        let req = axum::http::Request::builder()
            .uri("/forecast?amount=many")
            .body(axum::body::Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let rejection = QueryParams::<Amount>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_matches!(rejection, ApiError::BadRequest(_));
    }
}
