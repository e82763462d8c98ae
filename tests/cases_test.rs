mod common;

use common::{TestApp, TEST_CUSTOMER_ID};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_case_list(app: &TestApp, cases: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/customers/{}/cases", TEST_CUSTOMER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(cases))
        .mount(&app.giav)
        .await;
}

#[tokio::test]
async fn listing_normalizes_heterogeneous_records() {
    let app = TestApp::spawn().await;

    mount_case_list(
        &app,
        json!([
            {
                "idExpediente": 42,
                "Codigo": "EXP-42",
                "Titulo": "Algarve spring trip",
                "IdEtapa": 4,
                "FechaInicio": "2026-05-01T00:00:00",
                "FechaFin": "10/05/2026"
            },
            { "Id": "55", "Estado": "Open", "code": "EXP-55" }
        ]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/stages/expediente"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 4, "name": "Confirmed" }])),
        )
        .mount(&app.giav)
        .await;

    // Case 42 still owes money; case 55 is settled.
    app.mount_eligibility(42, json!({ "Total": 1000.0, "Pagado": 750.0 }))
        .await;
    app.mount_eligibility(55, json!({ "Total": 500.0, "Pagado": 500.0 }))
        .await;

    let response = app.get_cases().await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let cases = body["cases"].as_array().unwrap();
    assert_eq!(cases.len(), 2);

    assert_eq!(cases[0]["id"], 42);
    assert_eq!(cases[0]["code"], "EXP-42");
    assert_eq!(cases[0]["status"], "Confirmed");
    assert_eq!(cases[0]["date_range"], "01/05/2026 \u{2013} 10/05/2026");
    assert_eq!(cases[0]["bonus_available"], false);
    assert_eq!(cases[0]["payment"]["pending"], 250.0);

    assert_eq!(cases[1]["id"], 55);
    assert_eq!(cases[1]["status"], "Open");
    assert_eq!(cases[1]["bonus_available"], true);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_eligibility_leaves_bonus_unknown() {
    let app = TestApp::spawn().await;

    // One case, no reservations/calculation mounted: eligibility resolves
    // to "no data".
    mount_case_list(&app, json!([{ "Id": 42, "Estado": "Open" }])).await;

    let response = app.get_cases().await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    let case = &body["cases"][0];
    assert_eq!(case["bonus_available"], serde_json::Value::Null);
    assert!(case.get("payment").is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn upstream_failure_degrades_instead_of_erroring() {
    let app = TestApp::spawn().await;

    Mock::given(method("GET"))
        .and(path(format!("/customers/{}/cases", TEST_CUSTOMER_ID)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&app.giav)
        .await;

    let response = app.get_cases().await;

    // Still HTTP success: the client UI must keep rendering.
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert!(body["error"].as_str().unwrap().contains("upstream exploded"));
    assert_eq!(body["cases"].as_array().unwrap().len(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn unlinked_customer_cannot_list_cases() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/cases", app.address))
        .header("X-User-ID", "user-1")
        .header("X-Customer-ID", "0")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "no_client");

    app.cleanup().await;
}
