mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

async fn seed_sales(app: &TestApp) {
    for (client, date) in [
        ("Juan Dela Cruz", "2026-01-05"),
        ("Maria Santos", "2026-01-20"),
        ("juan ponce", "2026-02-03"),
        ("Pedro Reyes", "2026-02-14"),
    ] {
        let (status, body) = app
            .post(
                "/api/v1/sales",
                json!({ "date": date, "clientName": client, "amount": 100 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }
}

#[tokio::test]
async fn window_and_total_count() {
    let app = TestApp::new().await;
    seed_sales(&app).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/sales?_start=1&_end=3&_sort=seq&_order=asc",
            None,
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "4");

    let body = body_json(response).await;
    let seqs: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, vec![2, 3]);
}

#[tokio::test]
async fn default_order_is_newest_first() {
    let app = TestApp::new().await;
    seed_sales(&app).await;

    let (_, body) = app.get("/api/v1/sales").await;
    let first = &body.as_array().unwrap()[0];
    assert_eq!(first["seq"], 4);
}

#[tokio::test]
async fn like_filter_is_case_insensitive_and_counted() {
    let app = TestApp::new().await;
    seed_sales(&app).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/sales?clientName_like=JUAN&_sort=date&_order=desc",
            None,
            Some(app.token()),
        )
        .await;
    assert_eq!(response.headers()["x-total-count"], "2");

    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["clientName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["juan ponce", "Juan Dela Cruz"]);
}

#[tokio::test]
async fn like_filter_treats_wildcards_literally() {
    let app = TestApp::new().await;
    seed_sales(&app).await;

    let (status, body) = app.get("/api/v1/sales?clientName_like=%25").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn bad_list_params_are_rejected() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/sales?_sort=password",
        "/api/v1/sales?amount_like=100",
        "/api/v1/sales?_order=sideways",
        "/api/v1/sales?_start=5&_end=2",
        "/api/v1/procurements?_start=-1",
        "/api/v1/parts?_start=18446744073709551615",
        "/api/v1/parts?_end=18446744073709551615",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", uri, body);
        assert_eq!(body["error"], "Bad Request", "{}", uri);
    }
}

#[tokio::test]
async fn procurement_list_filters_by_supplier() {
    let app = TestApp::new().await;
    app.procure("Brake Pad", "Bosch", 2, 200.0).await;

    let (_, hits) = app.get("/api/v1/procurements?supplierName_like=metro").await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["partName"], "Brake Pad");

    let (_, misses) = app.get("/api/v1/procurements?supplierName_like=petron").await;
    assert!(misses.as_array().unwrap().is_empty());
}
