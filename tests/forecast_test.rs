mod common;

use axum::http::StatusCode;
use common::{dec, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn sale(app: &TestApp, date: &str, amount: i64) {
    let (status, body) = app
        .post(
            "/api/v1/sales",
            json!({ "date": date, "clientName": "Walk-in", "amount": amount }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn sales_forecast_groups_history_by_month() {
    let app = TestApp::new().await;
    sale(&app, "2026-01-03", 1000).await;
    sale(&app, "2026-01-25", 500).await;
    sale(&app, "2026-02-10", 2000).await;
    sale(&app, "2026-03-10", 2500).await;

    let (status, body) = app.get("/api/v1/forecast/sales").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["resource"], "sales");

    let history = body["history"].as_array().unwrap();
    let months: Vec<&str> = history.iter().map(|m| m["month"].as_str().unwrap()).collect();
    assert_eq!(months, vec!["2026-01", "2026-02", "2026-03"]);
    assert_eq!(dec(&history[0]["total"]), dec!(1500));

    let forecast = body["forecast"].as_array().unwrap();
    assert_eq!(forecast.len(), 6);
    assert_eq!(forecast[0]["month"], "2026-04");
    assert_eq!(forecast[5]["month"], "2026-09");
    assert!(forecast.iter().all(|m| dec(&m["total"]) >= dec!(0)));
}

#[tokio::test]
async fn forecast_period_count_is_bounded() {
    let app = TestApp::new().await;
    sale(&app, "2026-01-03", 1000).await;
    sale(&app, "2026-02-03", 1100).await;

    let (status, body) = app.get("/api/v1/forecast/sales?periods=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forecast"].as_array().unwrap().len(), 3);

    for periods in ["0", "25", "-1", "many"] {
        let (status, body) = app
            .get(&format!("/api/v1/forecast/sales?periods={}", periods))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", periods);
        assert_eq!(body["error"], "Bad Request", "{}", periods);
    }
}

#[tokio::test]
async fn single_month_has_no_projection() {
    let app = TestApp::new().await;
    app.procure("Brake Pad", "Bosch", 2, 200.0).await;

    let (status, body) = app.get("/api/v1/forecast/procurements").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert!(body["forecast"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_resource_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/v1/forecast/payroll").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn part_usage_sums_live_deployments() {
    let app = TestApp::new().await;
    app.procure("Brake Pad", "Bosch", 10, 1000.0).await;
    app.procure("Oil Filter", "Denso", 10, 1000.0).await;

    app.deploy("Brake Pad|Bosch", 2).await;
    app.deploy("Brake Pad|Bosch", 3).await;
    let (_, cancelled) = app.deploy("Oil Filter|Denso", 1).await;
    app.deploy("Oil Filter|Denso", 1).await;
    app.delete(&format!(
        "/api/v1/deployments/{}",
        cancelled["id"].as_str().unwrap()
    ))
    .await;

    let (status, body) = app.get("/api/v1/forecast/part-usage").await;
    assert_eq!(status, StatusCode::OK);
    let usage = body.as_array().unwrap();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0]["partName"], "Brake Pad");
    assert_eq!(usage[0]["totalUsed"], 5);
    assert_eq!(usage[1]["brandName"], "Denso");
    assert_eq!(usage[1]["totalUsed"], 1);
}
