mod common;

use axum::http::StatusCode;
use common::{dec, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn stock_follows_procurements_and_deployments() {
    let app = TestApp::new().await;

    let procurement = app.procure("Brake Pad", "Bosch", 10, 1120.0).await;
    let part_id = procurement["partId"].as_str().unwrap().to_string();
    assert_eq!(procurement["partName"], "Brake Pad");
    assert_eq!(procurement["brandName"], "Bosch");
    assert_eq!(procurement["seq"], 1);
    assert_eq!(dec(&procurement["netOfVAT"]), dec!(1000));
    assert_eq!(dec(&procurement["inputVAT"]), dec!(120));
    assert_eq!(app.qty_left(&part_id).await, 10);

    let (status, deployment) = app.deploy("Brake Pad|Bosch", 4).await;
    assert_eq!(status, StatusCode::CREATED, "{}", deployment);
    assert_eq!(app.qty_left(&part_id).await, 6);

    let (status, _) = app
        .delete(&format!("/api/v1/deployments/{}", deployment["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.qty_left(&part_id).await, 10);
}

#[tokio::test]
async fn second_purchase_of_same_part_reuses_it() {
    let app = TestApp::new().await;

    let first = app.procure("Oil Filter", "Denso", 3, 300.0).await;
    let second = app.procure("Oil Filter", "Denso", 2, 200.0).await;
    assert_eq!(first["partId"], second["partId"]);
    assert_eq!(second["seq"], 2);

    let part_id = first["partId"].as_str().unwrap();
    assert_eq!(app.qty_left(part_id).await, 5);

    let (_, parts) = app.get("/api/v1/parts").await;
    assert_eq!(parts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deployment_beyond_stock_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let procurement = app.procure("Spark Plug", "NGK", 2, 560.0).await;
    let part_id = procurement["partId"].as_str().unwrap();

    let (status, body) = app.deploy("Spark Plug|NGK", 5).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("has 2 left"));
    assert_eq!(app.qty_left(part_id).await, 2);

    let (_, deployments) = app.get("/api/v1/deployments").await;
    assert!(deployments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deployment_needs_existing_part_and_wellformed_key() {
    let app = TestApp::new().await;

    let (status, _) = app.deploy("Timing Belt|Gates", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.deploy("Timing Belt", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn procurement_edit_reconciles_stock() {
    let app = TestApp::new().await;
    let procurement = app.procure("Wiper", "Valeo", 10, 1000.0).await;
    let id = procurement["id"].as_str().unwrap();
    let part_id = procurement["partId"].as_str().unwrap();

    let (status, _) = app.deploy("Wiper|Valeo", 4).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.qty_left(part_id).await, 6);

    let (status, body) = app
        .patch(
            &format!("/api/v1/procurements/{}", id),
            json!({ "quantityBought": 12 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(app.qty_left(part_id).await, 8);

    // Dropping the purchase to 3 would leave -1 on hand.
    let (status, _) = app
        .patch(
            &format!("/api/v1/procurements/{}", id),
            json!({ "quantityBought": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.qty_left(part_id).await, 8);
}

#[tokio::test]
async fn procurement_moved_to_another_part_moves_its_stock() {
    let app = TestApp::new().await;
    let procurement = app.procure("Air Filter", "Denso", 5, 500.0).await;
    let id = procurement["id"].as_str().unwrap();
    let old_part = procurement["partId"].as_str().unwrap().to_string();

    let (status, moved) = app
        .patch(
            &format!("/api/v1/procurements/{}", id),
            json!({ "brandName": "Sakura" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", moved);
    assert_eq!(moved["brandName"], "Sakura");

    let new_part = moved["partId"].as_str().unwrap();
    assert_ne!(new_part, old_part);
    assert_eq!(app.qty_left(&old_part).await, 0);
    assert_eq!(app.qty_left(new_part).await, 5);
}

#[tokio::test]
async fn deleting_procurement_that_was_used_is_rejected() {
    let app = TestApp::new().await;
    let procurement = app.procure("Bulb", "Philips", 3, 150.0).await;
    let id = procurement["id"].as_str().unwrap();
    let part_id = procurement["partId"].as_str().unwrap();

    let (status, _) = app.deploy("Bulb|Philips", 2).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.delete(&format!("/api/v1/procurements/{}", id)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.qty_left(part_id).await, 1);

    let (status, _) = app.get(&format!("/api/v1/procurements/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_procurement_disappears_and_withdraws_stock() {
    let app = TestApp::new().await;
    let procurement = app.procure("Fuse", "Bosch", 4, 40.0).await;
    let id = procurement["id"].as_str().unwrap();
    let part_id = procurement["partId"].as_str().unwrap();

    let (status, body) = app.delete(&format!("/api/v1/procurements/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(app.qty_left(part_id).await, 0);

    let (status, _) = app.get(&format!("/api/v1/procurements/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/v1/procurements/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deployment_quantity_and_part_edits_reconcile_stock() {
    let app = TestApp::new().await;
    let pads = app.procure("Brake Pad", "Bosch", 10, 1000.0).await;
    let shoes = app.procure("Brake Shoe", "Bosch", 3, 300.0).await;
    let pads_id = pads["partId"].as_str().unwrap();
    let shoes_id = shoes["partId"].as_str().unwrap();

    let (_, deployment) = app.deploy("Brake Pad|Bosch", 4).await;
    let uri = format!("/api/v1/deployments/{}", deployment["id"].as_str().unwrap());

    let (status, _) = app.patch(&uri, json!({ "quantityUsed": 6 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.qty_left(pads_id).await, 4);

    // Moving all six to a part with only three on hand fails as a whole.
    let (status, _) = app.patch(&uri, json!({ "part": "Brake Shoe|Bosch" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.qty_left(pads_id).await, 4);
    assert_eq!(app.qty_left(shoes_id).await, 3);

    let (status, moved) = app
        .patch(&uri, json!({ "part": "Brake Shoe|Bosch", "quantityUsed": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", moved);
    assert_eq!(moved["partName"], "Brake Shoe");
    assert_eq!(app.qty_left(pads_id).await, 10);
    assert_eq!(app.qty_left(shoes_id).await, 1);
}

#[tokio::test]
async fn part_detail_lists_live_history() {
    let app = TestApp::new().await;
    let procurement = app.procure("Horn", "Hella", 2, 900.0).await;
    let part_id = procurement["partId"].as_str().unwrap();
    app.deploy("Horn|Hella", 1).await;

    let (status, part) = app.get(&format!("/api/v1/parts/{}", part_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(part["procurements"].as_array().unwrap().len(), 1);
    assert_eq!(part["deployments"].as_array().unwrap().len(), 1);
    assert_eq!(part["qtyLeft"], 1);
}

#[tokio::test]
async fn parts_catalogue_rules() {
    let app = TestApp::new().await;

    let (status, part) = app
        .post(
            "/api/v1/parts",
            json!({ "partName": "Radiator Cap", "brandName": "Tomei" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(part["qtyLeft"], 0);
    let uri = format!("/api/v1/parts/{}", part["id"].as_str().unwrap());

    let (status, _) = app
        .post(
            "/api/v1/parts",
            json!({ "partName": "Radiator Cap", "brandName": "Tomei" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Stock is owned by procurements and deployments.
    let (status, body) = app.patch(&uri, json!({ "qtyLeft": 50 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().unwrap().contains("qtyLeft"), "{}", body);

    let (status, renamed) = app.patch(&uri, json!({ "partName": "Radiator Cap 1.1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["partName"], "Radiator Cap 1.1");

    app.procure("Radiator Cap 1.1", "Tomei", 1, 100.0).await;
    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deployment_status_rules() {
    let app = TestApp::new().await;
    let procurement = app.procure("Brake Pad", "Bosch", 5, 500.0).await;
    let part_id = procurement["partId"].as_str().unwrap();

    let (_, deployment) = app.deploy("Brake Pad|Bosch", 2).await;
    assert_eq!(deployment["deploymentStatus"], false);
    let uri = format!("/api/v1/deployments/{}", deployment["id"].as_str().unwrap());

    let (status, _) = app.patch(&uri, json!({ "releaseStatus": true })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deployed) = app
        .patch(
            &uri,
            json!({ "deploymentStatus": true, "deploymentDate": "2026-03-06" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", deployed);
    assert_eq!(deployed["deploymentDate"], "2026-03-06");
    assert!(deployed["releaseDate"].is_null());

    // No date given, so today is stamped.
    let (_, released) = app.patch(&uri, json!({ "releaseStatus": true })).await;
    assert_eq!(released["releaseStatus"], true);
    assert!(released["releaseDate"].is_string());
    assert_eq!(app.qty_left(part_id).await, 3);

    let (_, reset) = app.patch(&uri, json!({ "deploymentStatus": false })).await;
    assert_eq!(reset["releaseStatus"], false);
    assert!(reset["releaseDate"].is_null());
    assert!(reset["deploymentDate"].is_null());
    assert_eq!(app.qty_left(part_id).await, 3);
}

#[tokio::test]
async fn purchase_past_the_stock_ceiling_is_rejected() {
    let app = TestApp::new().await;
    let first = app.procure("Bolt", "Acme", i32::MAX, 100.0).await;
    let part_id = first["partId"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/procurements",
            json!({
                "date": "2026-03-03",
                "supplierName": "Metro Auto Supply",
                "reference": "OR-1002",
                "tin": "123-456-789",
                "address": "12 Rizal Ave",
                "partName": "Bolt",
                "brandName": "Acme",
                "quantityBought": 1,
                "amount": 1
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(app.qty_left(part_id).await, i64::from(i32::MAX));

    let (_, procurements) = app.get("/api/v1/procurements").await;
    assert_eq!(procurements.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn part_with_only_deleted_history_can_be_removed() {
    let app = TestApp::new().await;
    let keep = app.procure("Fan Belt", "Gates", 2, 400.0).await;
    let gone = app.procure("Fan Belt", "Mitsuboshi", 1, 200.0).await;
    let gone_part = gone["partId"].as_str().unwrap();

    let (status, _) = app
        .delete(&format!("/api/v1/procurements/{}", gone["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete(&format!("/api/v1/parts/{}", gone_part)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let (status, _) = app.get(&format!("/api/v1/parts/{}", gone_part)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/v1/parts/{}", gone_part)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Other parts and their live rows are untouched.
    let (status, _) = app
        .get(&format!("/api/v1/procurements/{}", keep["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.qty_left(keep["partId"].as_str().unwrap()).await, 2);
}
