//! Session auth, admin management, attendance, and export endpoints.

mod common;

use common::TestApp;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn protected_routes_reject_anonymous_requests() {
    let app = TestApp::spawn().await;

    // No login on this client
    let anonymous = reqwest::Client::new();
    for path in ["/receipts", "/interns", "/admins", "/attendance?day=2026-08-14"] {
        let response = anonymous
            .get(format!("{}{}", app.address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "{path} must require a session");
    }

    // Health and metrics stay open for probes
    let response = anonymous
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn login_rejects_bad_credentials_and_disabled_accounts() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;

    let response = app
        .client
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": "nobody@example.com", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn superadmin_manages_admin_accounts() {
    let app = TestApp::spawn().await;
    let my_id = app.login_as_superadmin().await;

    let email = format!("colleague-{}@example.com", Uuid::new_v4());
    let response = app
        .client
        .post(format!("{}/admins", app.address))
        .json(&json!({
            "email": email,
            "password": "a-long-password",
            "full_name": "Colleague Admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["permission"], "admin");
    let created_id = created["user_id"].as_str().unwrap().to_string();

    // Disable, then the account can no longer log in
    let response = app
        .client
        .put(format!("{}/admins/{}/status", app.address, created_id))
        .json(&json!({ "status": "disabled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": email, "password": "a-long-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Self-targeting guards
    let response = app
        .client
        .put(format!("{}/admins/{}/status", app.address, my_id))
        .json(&json!({ "status": "disabled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn attendance_upserts_per_intern_per_day() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;
    let intern_id = app.register_intern().await.to_string();

    let mark = |status: &str| {
        json!({
            "intern_id": intern_id,
            "day": "2026-08-14",
            "status": status
        })
    };

    let response = app
        .client
        .post(format!("{}/attendance", app.address))
        .json(&mark("present"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Re-marking the same day overwrites instead of conflicting
    let response = app
        .client
        .post(format!("{}/attendance", app.address))
        .json(&mark("late"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .get(format!("{}/attendance?day=2026-08-14", app.address))
        .send()
        .await
        .unwrap();
    let records: Value = response.json().await.unwrap();
    let for_intern: Vec<&Value> = records
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["intern_id"] == intern_id.as_str())
        .collect();
    assert_eq!(for_intern.len(), 1);
    assert_eq!(for_intern[0]["status"], "late");
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn exports_return_csv_and_xlsx() {
    let app = TestApp::spawn().await;
    app.login_as_superadmin().await;

    let response = app
        .client
        .get(format!("{}/exports/receipts.csv", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/csv"
    );
    let text = response.text().await.unwrap();
    assert!(text.starts_with("Receipt Number"));

    let response = app
        .client
        .get(format!(
            "{}/exports/attendance.xlsx?start=2026-08-01&end=2026-08-31",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let bytes = response.bytes().await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn user_column_defaults_match_handler_vocabulary() {
    let app = TestApp::spawn().await;

    // A row taking the column defaults must come back with values the
    // permission checks and status filters recognize.
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (user_id, email, password_hash, full_name) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(format!("default-{user_id}@example.com"))
    .bind("not-a-real-hash")
    .bind("Default Admin")
    .execute(app.db.pool())
    .await
    .expect("insert with defaults failed");

    let (permission, status): (String, String) =
        sqlx::query_as("SELECT permission, status FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(app.db.pool())
            .await
            .unwrap();
    assert_eq!(permission, "admin");
    assert_eq!(status, "active");
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn admin_with_recorded_receipts_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let recorder_id = app.login_as_superadmin().await;
    let intern_id = app.register_intern().await;

    let response = app
        .client
        .post(format!("{}/receipts", app.address))
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
        .unwrap();
    assert_eq!(response.status(), 201);

    // A second superadmin takes over the session and tries the delete
    app.login_as_superadmin().await;
    let response = app
        .client
        .delete(format!("{}/admins/{}", app.address, recorder_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409, "receipt author must not be deletable");

    // Disabling remains available
    let response = app
        .client
        .put(format!("{}/admins/{}/status", app.address, recorder_id))
        .json(&json!({ "status": "disabled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
