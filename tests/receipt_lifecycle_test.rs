//! Receipt lifecycle integration tests: sequence minting, the partial
//! payment ledger, void semantics, and the audit trail.
//!
//! These tests need a local PostgreSQL (TEST_DATABASE_URL); they are ignored
//! by default so the unit suite stays self-contained.

mod common;

use common::TestApp;
use serde_json::{json, Value};
use serial_test::serial;

async fn create_receipt(app: &TestApp, intern_id: &str, due: &str, paid: &str) -> Value {
    let response = app
        .client
        .post(format!("{}/receipts", app.address))
        .json(&json!({
            "intern_id": intern_id,
            "payment_date": "2026-08-14",
            "payment_type": "tuition",
            "amount_due": due,
            "amount_paid": paid,
            "payment_method": "cash",
            "received_by": "Front Desk"
        }))
        .send()
        .await
        .expect("Failed to create receipt");
    assert_eq!(response.status(), 201, "receipt creation failed");
    response.json().await.expect("receipt body")
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn receipt_numbers_are_sequential_within_month() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let first = create_receipt(&app, &intern_id, "50000", "0").await;
    let second = create_receipt(&app, &intern_id, "50000", "0").await;

    let first_number = first["receipt_number"].as_str().unwrap();
    let second_number = second["receipt_number"].as_str().unwrap();

    assert!(first_number.starts_with("ETS/2026/08/"));
    let first_seq: u32 = first_number.rsplit('/').next().unwrap().parse().unwrap();
    let second_seq: u32 = second_number.rsplit('/').next().unwrap().parse().unwrap();
    assert_eq!(second_seq, first_seq + 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn partial_payments_drive_derived_status() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let receipt = create_receipt(&app, &intern_id, "50000", "20000").await;
    assert_eq!(receipt["payment_status"], "pending_payment");
    let number = receipt["receipt_number"].as_str().unwrap().to_string();

    // 20000 + 30000 == 50000: exact settlement is accepted
    let response = app
        .client
        .post(format!("{}/receipts/{}/payments", app.address, number))
        .json(&json!({ "amount": "30000", "method": "cash", "paid_on": "2026-08-20" }))
        .send()
        .await
        .expect("Failed to add payment");
    assert_eq!(response.status(), 201);
    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["status"], "paid_in_full");
    assert_eq!(outcome["remaining_balance"], "0");

    // One more franc is rejected, and the error reports the exact headroom
    let response = app
        .client
        .post(format!("{}/receipts/{}/payments", app.address, number))
        .json(&json!({ "amount": "1", "method": "cash", "paid_on": "2026-08-21" }))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["remaining"], "0");

    // The rejected payment wrote nothing
    let response = app
        .client
        .get(format!("{}/receipts/{}", app.address, number))
        .send()
        .await
        .unwrap();
    let detail: Value = response.json().await.unwrap();
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
    assert_eq!(detail["payment_status"], "paid_in_full");
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn voided_receipts_leave_listings_but_stay_addressable() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let receipt = create_receipt(&app, &intern_id, "10000", "10000").await;
    let number = receipt["receipt_number"].as_str().unwrap().to_string();

    // Void without a reason is rejected
    let response = app
        .client
        .post(format!("{}/receipts/{}/void", app.address, number))
        .json(&json!({ "reason": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let response = app
        .client
        .post(format!("{}/receipts/{}/void", app.address, number))
        .json(&json!({ "reason": "duplicate entry" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // Double void is rejected
    let response = app
        .client
        .post(format!("{}/receipts/{}/void", app.address, number))
        .json(&json!({ "reason": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Gone from listings
    let response = app
        .client
        .get(format!("{}/receipts", app.address))
        .send()
        .await
        .unwrap();
    let listing: Value = response.json().await.unwrap();
    let found = listing
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["receipt_number"] == number.as_str());
    assert!(!found, "voided receipt must not appear in listings");

    // Still addressable directly, with void metadata
    let response = app
        .client
        .get(format!("{}/receipts/{}", app.address, number))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let detail: Value = response.json().await.unwrap();
    assert_eq!(detail["status"], "void");
    assert_eq!(detail["void_reason"], "duplicate entry");

    // Payments against a voided receipt are rejected
    let response = app
        .client
        .post(format!("{}/receipts/{}/payments", app.address, number))
        .json(&json!({ "amount": "1", "method": "cash", "paid_on": "2026-08-22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn audit_trail_records_every_mutation() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let receipt = create_receipt(&app, &intern_id, "50000", "0").await;
    let number = receipt["receipt_number"].as_str().unwrap().to_string();

    app.client
        .post(format!("{}/receipts/{}/payments", app.address, number))
        .json(&json!({ "amount": "20000", "method": "cash", "paid_on": "2026-08-15" }))
        .send()
        .await
        .unwrap();

    app.client
        .post(format!("{}/receipts/{}/void", app.address, number))
        .json(&json!({ "reason": "entered against wrong intern" }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .get(format!("{}/receipts/{}/audit-log", app.address, number))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let entries: Value = response.json().await.unwrap();
    let actions: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["CREATE", "PARTIAL_PAYMENT", "VOID"]);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn receipt_pdf_is_served_for_active_and_void() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let receipt = create_receipt(&app, &intern_id, "10000", "10000").await;
    let number = receipt["receipt_number"].as_str().unwrap().to_string();

    let response = app
        .client
        .get(format!("{}/receipts/{}/pdf", app.address, number))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    let bytes = response.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn concurrent_creates_mint_distinct_numbers() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    // Race the per-month counter from one logged-in client
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = app.client.clone();
        let address = app.address.clone();
        let intern_id = intern_id.clone();
        handles.push(tokio::spawn(async move {
            let response = client
                .post(format!("{address}/receipts"))
                .json(&json!({
                    "intern_id": intern_id,
                    "payment_date": "2026-08-14",
                    "payment_type": "tuition",
                    "amount_due": "50000",
                    "amount_paid": "0",
                    "payment_method": "cash"
                }))
                .send()
                .await
                .expect("Failed to create receipt");
            assert_eq!(response.status(), 201, "concurrent creation failed");
            let body: Value = response.json().await.expect("receipt body");
            body["receipt_number"].as_str().unwrap().to_string()
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.expect("create task panicked"));
    }

    let distinct: std::collections::HashSet<&String> = numbers.iter().collect();
    assert_eq!(distinct.len(), numbers.len(), "duplicate receipt numbers: {numbers:?}");
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn intern_receipts_list_payment_history() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let kept = create_receipt(&app, &intern_id, "50000", "20000").await;
    let voided = create_receipt(&app, &intern_id, "10000", "0").await;

    let response = app
        .client
        .post(format!(
            "{}/receipts/{}/void",
            app.address,
            voided["receipt_id"].as_str().unwrap()
        ))
        .json(&json!({ "reason": "entry error" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .client
        .get(format!("{}/interns/{}/receipts", app.address, intern_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let history: Value = response.json().await.unwrap();
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 1, "voided receipts stay out of the history");
    assert_eq!(rows[0]["receipt_number"], kept["receipt_number"]);
    assert_eq!(rows[0]["payment_status"], "pending_payment");
    assert_eq!(rows[0]["total_paid"], "20000");

    let response = app
        .client
        .get(format!(
            "{}/interns/{}/receipts",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn outbox_delivers_queued_documents() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let receipt = create_receipt(&app, &intern_id, "50000", "0").await;
    let receipt_id = uuid::Uuid::parse_str(receipt["receipt_id"].as_str().unwrap()).unwrap();

    // The worker polls every second in the test config
    let mut status = String::new();
    for _ in 0..15 {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM document_outbox WHERE receipt_id = $1",
        )
        .bind(receipt_id)
        .fetch_one(app.db.pool())
        .await
        .expect("outbox row missing");
        if status == "sent" {
            break;
        }
    }
    assert_eq!(status, "sent", "outbox entry was not delivered");
}
