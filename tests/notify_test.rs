mod common;

use common::{TestApp, TEST_CUSTOMER_ID};
use golf_portal_service::models::{IntentStatus, PaymentIntent};
use golf_portal_service::services::inespay::RailCustomData;
use mongodb::bson::doc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// Run a bank-transfer request to completion of the init call and return the
/// custom-data blob the rail received.
async fn initiate_bank_transfer(app: &TestApp) -> String {
    app.mount_eligibility(42, json!({ "Total": 1000.0, "Pagado": 750.0 }))
        .await;

    Mock::given(method("POST"))
        .and(path("/payins/single"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "singlePayinId": "sp_1",
            "url": "https://rail.example/redirect/sp_1"
        })))
        .mount(&app.inespay)
        .await;

    let response = app
        .post_intent(json!({
            "expediente_id": 42, "type": "balance", "method": "bank_transfer"
        }))
        .await;
    assert_eq!(response.status(), 200);

    let requests = app.inespay.received_requests().await.unwrap();
    let rail_body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    rail_body["customData"].as_str().unwrap().to_string()
}

async fn post_notify(app: &TestApp, body: serde_json::Value) -> reqwest::Response {
    app.client
        .post(format!("{}/payments/inespay/notify", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to send notification")
}

async fn stored_intent(app: &TestApp) -> PaymentIntent {
    app.intents()
        .find_one(doc! {}, None)
        .await
        .unwrap()
        .expect("intent not stored")
}

#[tokio::test]
async fn successful_notification_completes_the_intent() {
    let app = TestApp::spawn().await;
    let custom_data = initiate_bank_transfer(&app).await;

    let response = post_notify(
        &app,
        json!({ "customData": custom_data, "status": "DONE", "singlePayinId": "sp_1" }),
    )
    .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "COMPLETED");

    let intent = stored_intent(&app).await;
    assert_eq!(intent.status, IntentStatus::Completed);
    assert_eq!(intent.payload["inespay_notify"]["status"], "DONE");
    // The init audit entry survives the notify merge.
    assert_eq!(intent.payload["inespay_init"]["status"], "ok");

    app.cleanup().await;
}

#[tokio::test]
async fn replayed_notification_is_a_no_op() {
    let app = TestApp::spawn().await;
    let custom_data = initiate_bank_transfer(&app).await;

    let first = post_notify(&app, json!({ "customData": custom_data, "status": "DONE" })).await;
    assert_eq!(first.status(), 200);

    let replay = post_notify(&app, json!({ "customData": custom_data, "status": "DONE" })).await;
    assert_eq!(replay.status(), 200);
    let body: serde_json::Value = replay.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "COMPLETED");

    assert_eq!(stored_intent(&app).await.status, IntentStatus::Completed);

    app.cleanup().await;
}

#[tokio::test]
async fn failure_notification_marks_the_intent_failed() {
    let app = TestApp::spawn().await;
    let custom_data = initiate_bank_transfer(&app).await;

    let response = post_notify(
        &app,
        json!({ "customData": custom_data, "status": "REJECTED" }),
    )
    .await;

    assert_eq!(response.status(), 200);
    let intent = stored_intent(&app).await;
    assert_eq!(intent.status, IntentStatus::Failed);
    assert_eq!(intent.payload["inespay_notify"]["status"], "REJECTED");

    app.cleanup().await;
}

#[tokio::test]
async fn late_failure_after_completion_does_not_regress() {
    let app = TestApp::spawn().await;
    let custom_data = initiate_bank_transfer(&app).await;

    post_notify(&app, json!({ "customData": custom_data, "status": "DONE" })).await;
    let response = post_notify(
        &app,
        json!({ "customData": custom_data, "status": "REJECTED" }),
    )
    .await;

    assert_eq!(response.status(), 200);
    assert_eq!(stored_intent(&app).await.status, IntentStatus::Completed);

    app.cleanup().await;
}

#[tokio::test]
async fn token_mismatch_is_rejected() {
    let app = TestApp::spawn().await;
    let custom_data = initiate_bank_transfer(&app).await;

    let genuine = RailCustomData::decode(&custom_data).unwrap();
    let forged = RailCustomData {
        token: "ffffffffffff".to_string(),
        ..genuine
    }
    .encode()
    .unwrap();

    let response = post_notify(&app, json!({ "customData": forged, "status": "DONE" })).await;

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "notification_rejected");
    assert_eq!(stored_intent(&app).await.status, IntentStatus::Initiated);

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_intent_is_reported() {
    let app = TestApp::spawn().await;

    let custom_data = RailCustomData {
        intent_id: Uuid::new_v4(),
        token: "abcdefabcdef".to_string(),
        case_id: 42,
        customer_id: TEST_CUSTOMER_ID,
        payer_name: None,
    }
    .encode()
    .unwrap();

    let response = post_notify(&app, json!({ "customData": custom_data, "status": "DONE" })).await;

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "intent_missing");

    app.cleanup().await;
}

#[tokio::test]
async fn undecodable_custom_data_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = post_notify(&app, json!({ "customData": "%%%", "status": "DONE" })).await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_notification");

    let response = post_notify(&app, json!({ "status": "DONE" })).await;
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}
