#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use autoshop_api::{
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const OWNER_EMAIL: &str = "owner@shop.test";
pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Helper harness for spinning up the full router over a private in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    pub user_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state and a
    /// signed-in owner account.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.allowed_emails = vec![OWNER_EMAIL.to_string()];
        tweak(&mut cfg);

        // One connection, so every query sees the same in-memory database.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..DbConfig::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx, cfg.low_stock_threshold));

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), EventSender::new(event_tx))
            .expect("valid application state");
        let router = autoshop_api::build_router(state.clone());

        let mut app = Self {
            router,
            state,
            token: String::new(),
            user_id: Uuid::nil(),
            _event_task: event_task,
        };

        let (user_id, token) = app.sign_in("Shop Owner", OWNER_EMAIL).await;
        app.user_id = user_id;
        app.token = token;
        app
    }

    /// Bearer token for the default owner account.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Signs in (registering on first use) and returns the account id and token.
    pub async fn sign_in(&self, name: &str, email: &str) -> (Uuid, String) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/users",
                Some(json!({ "name": name, "email": email, "avatar": "" })),
                None,
            )
            .await;
        assert!(
            response.status().is_success(),
            "sign-in failed with {}",
            response.status()
        );
        let body = body_json(response).await;
        let id = Uuid::parse_str(body["user"]["id"].as_str().expect("user id")).expect("uuid");
        let token = body["token"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_string();
        (id, token)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated request as the owner, returning status and JSON body.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(self.token())).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Records a procurement with full supplier details and returns its body.
    pub async fn procure(&self, part: &str, brand: &str, quantity: i32, amount: f64) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/procurements",
                json!({
                    "date": "2026-03-02",
                    "supplierName": "Metro Auto Supply",
                    "reference": "OR-1001",
                    "tin": "123-456-789",
                    "address": "12 Rizal Ave",
                    "description": "restock",
                    "partName": part,
                    "brandName": brand,
                    "quantityBought": quantity,
                    "amount": amount
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "procurement failed: {}", body);
        body
    }

    /// Books a deployment of `quantity` units of `part|brand`.
    pub async fn deploy(&self, part_key: &str, quantity: i32) -> (StatusCode, Value) {
        self.post(
            "/api/v1/deployments",
            json!({
                "date": "2026-03-05",
                "clientName": "Juan Dela Cruz",
                "vehicleName": "Toyota Vios",
                "carRegistration": "ABC 1234",
                "part": part_key,
                "quantityUsed": quantity
            }),
        )
        .await
    }

    /// Current stock of a part by id.
    pub async fn qty_left(&self, part_id: &str) -> i64 {
        let (status, body) = self.get(&format!("/api/v1/parts/{}", part_id)).await;
        assert_eq!(status, StatusCode::OK, "part lookup failed: {}", body);
        body["qtyLeft"].as_i64().expect("qtyLeft")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a response body as JSON; an empty body becomes `Value::Null`.
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not JSON")
    }
}

/// Money fields are serialized as strings; accept numbers too.
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}
