pub mod utils;

use std::future::IntoFuture;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::billing::signing;
use utils::{TestHarness, VOICE, WEBHOOK_SECRET};

fn signed_delivery(id: &str, body: &str) -> [(&'static str, String); 3] {
    let timestamp = Utc::now().timestamp();
    let secret = signing::decode_secret(WEBHOOK_SECRET).unwrap();
    [
        (signing::HEADER_ID, id.to_string()),
        (signing::HEADER_TIMESTAMP, timestamp.to_string()),
        (signing::HEADER_SIGNATURE, signing::sign_payload(id, timestamp, body, &secret)),
    ]
}

/// End-to-end user journey: signup grant, voice upload, generation with the uploaded voice,
/// a credit purchase, then the ledger and cleanup.
#[test_log::test(tokio::test)]
async fn test_e2e_account_journey() {
    let harness = TestHarness::new().await;
    harness.mock_synthesis_success().await;
    let account_id = Uuid::new_v4();
    let auth = harness.bearer(account_id);
    let server = harness.server();

    // Step 1: First contact creates the account with its signup grant
    let response = server.get("/api/v1/credits/balance").add_header("authorization", &auth).await;
    response.assert_status_ok();
    let balance: Value = response.json();
    assert_eq!(balance["credits"], 10);
    assert_eq!(balance["account_id"], account_id.to_string());

    // Step 2: Upload a reference voice
    let response = server
        .post("/api/v1/voices")
        .add_header("authorization", &auth)
        .multipart(
            MultipartForm::new().add_text("name", "Narrator").add_part(
                "file",
                Part::bytes(b"RIFF....WAVEfmt ".to_vec())
                    .file_name("narrator.wav")
                    .mime_type("audio/wav"),
            ),
        )
        .await;
    response.assert_status(StatusCode::CREATED);
    let voice: Value = response.json();
    let voice_key = voice["s3_key"].as_str().unwrap().to_string();

    // Step 3: Generate 450 characters with it: 5 credits
    let response = server
        .post("/api/v1/speech")
        .add_header("authorization", &auth)
        .json(&json!({ "text": "x".repeat(450), "voice_s3_key": voice_key, "language": "de", "exaggeration": 0.9 }))
        .await;
    response.assert_status_ok();
    let generated: Value = response.json();
    assert_eq!(generated["credits_charged"], 5);
    assert_eq!(generated["balance"], 5);
    let project_id = generated["project_id"].as_str().unwrap().to_string();

    // Step 4: Buy the medium tier
    let body = json!({
        "type": "order.paid",
        "data": { "id": "ord_1", "product_id": "prod_medium", "customer": { "external_id": account_id } }
    })
    .to_string();
    let mut request = server.post("/webhooks/payments");
    for (name, value) in signed_delivery("msg_journey", &body) {
        request = request.add_header(name, value);
    }
    let response = request.text(body).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["outcome"], "applied");
    assert_eq!(harness.balance(account_id).await, 255);

    // Step 5: The ledger shows every movement, newest first, with running balances
    let response = server
        .get("/api/v1/credits/transactions")
        .add_header("authorization", &auth)
        .await;
    response.assert_status_ok();
    let ledger: Value = response.json();
    let entries = ledger["data"].as_array().unwrap();
    let summary: Vec<(String, i64, i64)> = entries
        .iter()
        .map(|e| {
            (
                e["transaction_type"].as_str().unwrap().to_string(),
                e["amount"].as_i64().unwrap(),
                e["balance_after"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("purchase".to_string(), 250, 255),
            ("usage".to_string(), -5, 5),
            ("signup_grant".to_string(), 10, 10),
        ]
    );

    // Step 6: Delete the project; the listing is empty again and the credits stay spent
    server
        .delete(&format!("/api/v1/projects/{project_id}"))
        .add_header("authorization", &auth)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let response = server.get("/api/v1/projects").add_header("authorization", &auth).await;
    assert!(response.json::<Value>()["data"].as_array().unwrap().is_empty());
    assert_eq!(harness.balance(account_id).await, 255);
}

/// Many simultaneous generations against a small balance never overdraw it
#[tokio::test]
async fn test_concurrent_generations_never_overdraw() {
    let harness = TestHarness::builder().initial_credits(10).build().await;
    harness.mock_synthesis_success().await;
    let account_id = Uuid::new_v4();
    harness.create_account(account_id).await;
    let server = harness.server();
    let auth = harness.bearer(account_id);

    // 300 characters cost 3 credits each
    let body = json!({ "text": "y".repeat(300), "voice_s3_key": VOICE, "language": "en" });
    let requests = (0..8).map(|_| {
        server
            .post("/api/v1/speech")
            .add_header("authorization", &auth)
            .json(&body)
            .into_future()
    });
    let responses = futures::future::join_all(requests).await;

    let succeeded = responses.iter().filter(|r| r.status_code() == StatusCode::OK).count();
    let refused = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::PAYMENT_REQUIRED)
        .count();
    assert_eq!(succeeded, 3);
    assert_eq!(refused, 5);
    assert_eq!(harness.balance(account_id).await, 1);
    assert_eq!(harness.project_count(account_id).await, 3);
}

/// Accounts never see or touch each other's data
#[tokio::test]
async fn test_accounts_are_isolated() {
    let harness = TestHarness::new().await;
    harness.mock_synthesis_success().await;
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let server = harness.server();

    let response = server
        .post("/api/v1/speech")
        .add_header("authorization", harness.bearer(alice))
        .json(&json!({ "text": "private", "voice_s3_key": VOICE, "language": "en" }))
        .await;
    let project_id = response.json::<Value>()["project_id"].as_str().unwrap().to_string();

    // Bob cannot delete it, and the answer is the same as for a missing project
    let foreign = server
        .delete(&format!("/api/v1/projects/{project_id}"))
        .add_header("authorization", harness.bearer(bob))
        .await;
    let missing = server
        .delete(&format!("/api/v1/projects/{}", Uuid::new_v4()))
        .add_header("authorization", harness.bearer(bob))
        .await;
    foreign.assert_status_not_found();
    missing.assert_status_not_found();
    assert_eq!(foreign.json::<Value>(), missing.json::<Value>());

    let response = server
        .get("/api/v1/credits/transactions")
        .add_header("authorization", harness.bearer(bob))
        .await;
    let ledger: Value = response.json();
    assert_eq!(ledger["data"].as_array().unwrap().len(), 1);
    assert_eq!(harness.project_count(alice).await, 1);
}

/// Identity asserted by a trusted proxy header works alongside session tokens
#[tokio::test]
async fn test_proxy_header_identity() {
    let mut harness = TestHarness::new().await;
    harness.state.config.auth.proxy_header.enabled = true;
    harness.state.sessions = crate::auth::session::create_session_provider(&harness.state.config.auth).unwrap();
    let account_id = Uuid::new_v4();

    let response = harness
        .server()
        .get("/api/v1/credits/balance")
        .add_header("x-ttsctl-account", account_id.to_string())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["account_id"], account_id.to_string());

    // Session tokens still work
    harness
        .server()
        .get("/api/v1/credits/balance")
        .add_header("authorization", harness.bearer(account_id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_expired_or_forged_tokens_rejected() {
    let harness = TestHarness::new().await;
    let server = harness.server();

    server
        .get("/api/v1/projects")
        .add_header("authorization", "Bearer not-a-token")
        .await
        .assert_status_unauthorized();

    let other = crate::config::SessionConfig {
        secret_key: Some("some-other-secret".to_string()),
        ..Default::default()
    };
    let forged = crate::auth::session::JwtSessionProvider::new(&other)
        .unwrap()
        .issue(Uuid::new_v4(), None)
        .unwrap();
    server
        .get("/api/v1/projects")
        .add_header("authorization", format!("Bearer {forged}"))
        .await
        .assert_status_unauthorized();
}
