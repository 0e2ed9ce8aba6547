//! Autoshop API Library
//!
//! Back office for an auto repair and parts shop: parts stock fed by
//! procurements and drawn down by deployments, sales and expenses with VAT,
//! monthly forecasts and a public job lookup for clients.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware, Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

use crate::{
    auth::{auth_middleware, AuthConfig, AuthService},
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    handlers::common::TOTAL_COUNT_HEADER,
    middleware_helpers::REQUEST_ID_HEADER,
    services::{ServiceContainer, ServiceFactory},
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub event_sender: EventSender,
    pub services: ServiceContainer,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wires every service against one connection pool and event channel.
    pub fn new(
        db: Arc<DbPool>,
        config: Arc<AppConfig>,
        event_sender: EventSender,
    ) -> Result<Self, ServiceError> {
        let factory = ServiceFactory::new(db.clone(), event_sender.clone(), config.clone())?;
        let services = ServiceContainer::new(&factory);
        let auth = Arc::new(AuthService::new(
            AuthConfig::from(config.as_ref()),
            db.clone(),
        ));

        Ok(Self {
            db,
            config,
            event_sender,
            services,
            auth,
        })
    }
}

/// `/api/v1` routes. Everything but sign-in requires a bearer token.
pub fn api_v1_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/properties", handlers::properties::property_routes())
        .nest("/parts", handlers::parts::part_routes())
        .nest("/procurements", handlers::procurements::procurement_routes())
        .nest("/deployments", handlers::deployments::deployment_routes())
        .nest("/sales", handlers::sales::sale_routes())
        .nest("/expenses", handlers::expenses::expense_routes())
        .nest("/forecast", handlers::forecasts::forecast_routes())
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/users", handlers::users::user_routes(state))
        .merge(protected)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, request_id.clone()])
        .expose_headers([HeaderName::from_static(TOTAL_COUNT_HEADER), request_id]);

    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        ::tracing::info!("no CORS origins configured; allowing any origin");
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}

/// Full application: health, client portal, `/api/v1`, Swagger UI and the
/// shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/health", health::health_routes())
        .nest(
            "/clientPortal",
            handlers::client_portal::client_portal_routes(),
        )
        .nest("/api/v1", api_v1_routes(&state))
        .merge(openapi::swagger_ui())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
