//! Integration tests for registration, login, and password recovery.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//!   (cargo run -p sunleaf-cli -- migrate run)
//! - The API server running (cargo run -p sunleaf-api)
//! - `DATABASE_URL` set, for reading issued one-time codes
//!
//! SMTP does not need to be configured; the server logs codes instead of
//! emailing them, and these tests read them from the database.
//!
//! Run with: cargo test -p sunleaf-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;

use sunleaf_integration_tests::{api_base_url, connect_pool, unique_phone, unique_suffix};

/// Credentials of a freshly registered account.
struct TestUser {
    username: String,
    email: String,
    phone: String,
    password: String,
}

/// Test helper: register a new customer account.
async fn register_test_user(client: &Client) -> TestUser {
    let suffix = unique_suffix();
    let user = TestUser {
        username: format!("user{suffix}"),
        email: format!("user{suffix}@example.com"),
        phone: unique_phone(),
        password: "orchard-gate-7".to_string(),
    };

    let resp = client
        .post(format!("{}/api/auth/register", api_base_url()))
        .json(&json!({
            "name": "Test User",
            "email": user.email,
            "username": user.username,
            "password": user.password,
            "phone": user.phone,
            "role": "customer",
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), StatusCode::CREATED);

    user
}

/// Test helper: log in and return the session token with the full body.
async fn login(client: &Client, username: &str, password: &str) -> (String, Value) {
    let resp = client
        .post(format!("{}/api/auth/login", api_base_url()))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Login response was not JSON");
    let token = body["token"]
        .as_str()
        .expect("Login response missing token")
        .to_string();
    (token, body)
}

/// Test helper: read the one-time code issued for a phone.
async fn fetch_code(pool: &PgPool, phone: &str) -> String {
    sqlx::query_scalar::<_, String>("SELECT code FROM one_time_codes WHERE phone = $1")
        .bind(phone)
        .fetch_one(pool)
        .await
        .expect("No one-time code stored for phone")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_health_endpoints() {
    let client = Client::new();
    let base_url = api_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach health endpoint");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach readiness endpoint");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Registration & Login
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_register_and_login_roundtrip() {
    let client = Client::new();
    let user = register_test_user(&client).await;

    let (token, body) = login(&client, &user.username, &user.password).await;
    assert!(!token.is_empty());
    assert_eq!(body["role"], "customer");
    assert_eq!(body["email"], user.email);
    assert!(body["userId"].is_number());
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_register_rejects_missing_fields() {
    let client = Client::new();

    let resp = client
        .post(format!("{}/api/auth/register", api_base_url()))
        .json(&json!({ "username": "lonely" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(
        body["error"],
        "Name, email, username, password, phone, and role are required"
    );
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_register_rejects_bad_phone_and_role() {
    let client = Client::new();
    let base_url = api_base_url();
    let suffix = unique_suffix();

    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({
            "name": "Test User",
            "email": format!("bad{suffix}@example.com"),
            "username": format!("bad{suffix}"),
            "password": "orchard-gate-7",
            "phone": "12345",
            "role": "customer",
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Phone number must be 10 digits");

    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({
            "name": "Test User",
            "email": format!("bad{suffix}@example.com"),
            "username": format!("bad{suffix}"),
            "password": "orchard-gate-7",
            "phone": unique_phone(),
            "role": "superuser",
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Role must be customer or admin");
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_register_rejects_duplicate_identity() {
    let client = Client::new();
    let user = register_test_user(&client).await;

    // Same username again, fresh email and phone
    let resp = client
        .post(format!("{}/api/auth/register", api_base_url()))
        .json(&json!({
            "name": "Someone Else",
            "email": format!("other{}@example.com", unique_suffix()),
            "username": user.username,
            "password": "orchard-gate-7",
            "phone": unique_phone(),
            "role": "customer",
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Username, email, or phone already exists");
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_login_rejects_bad_credentials() {
    let client = Client::new();
    let base_url = api_base_url();
    let user = register_test_user(&client).await;

    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "username": user.username, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid credentials");

    // Unknown accounts get the same message as wrong passwords
    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "username": format!("ghost{}", unique_suffix()), "password": "whatever" }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid credentials");

    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "username": user.username }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Username and password are required");
}

// ============================================================================
// Password Recovery
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_password_recovery_flow() {
    let client = Client::new();
    let pool = connect_pool().await;
    let base_url = api_base_url();
    let user = register_test_user(&client).await;

    // Step 1: request a code, identified by username
    let resp = client
        .post(format!("{base_url}/api/auth/request-otp"))
        .json(&json!({ "identifier": user.username }))
        .send()
        .await
        .expect("Failed to send request-otp request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "OTP sent to your registered email address");
    // Local part is masked down to its first two characters
    assert_eq!(body["maskedEmail"], "us***@example.com");

    // Step 2: exchange the code for a reset token
    let code = fetch_code(&pool, &user.phone).await;
    let resp = client
        .post(format!("{base_url}/api/auth/verify-otp"))
        .json(&json!({ "identifier": user.username, "otp": code }))
        .send()
        .await
        .expect("Failed to send verify-otp request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["success"], true);
    let reset_token = body["resetToken"]
        .as_str()
        .expect("Response missing resetToken")
        .to_string();

    // The code was consumed; it cannot verify twice
    let resp = client
        .post(format!("{base_url}/api/auth/verify-otp"))
        .json(&json!({ "identifier": user.username, "otp": code }))
        .send()
        .await
        .expect("Failed to send verify-otp request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid or expired OTP");

    // Step 3: set a new password
    let new_password = "new-orchard-gate-9";
    let resp = client
        .post(format!("{base_url}/api/auth/reset-password"))
        .json(&json!({ "resetToken": reset_token, "newPassword": new_password }))
        .send()
        .await
        .expect("Failed to send reset-password request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(
        body["message"],
        "Password reset successfully. You can now login with your new password."
    );

    // Old password no longer works; the new one does
    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "username": user.username, "password": user.password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    login(&client, &user.username, new_password).await;
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_second_request_leaves_one_active_code() {
    let client = Client::new();
    let pool = connect_pool().await;
    let base_url = api_base_url();
    let user = register_test_user(&client).await;

    for _ in 0..2 {
        let resp = client
            .post(format!("{base_url}/api/auth/request-otp"))
            .json(&json!({ "identifier": user.username }))
            .send()
            .await
            .expect("Failed to send request-otp request");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM one_time_codes WHERE phone = $1",
    )
    .bind(&user.phone)
    .fetch_one(&pool)
    .await
    .expect("Failed to count codes");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_verify_otp_rejects_code_older_than_five_minutes() {
    let client = Client::new();
    let pool = connect_pool().await;
    let base_url = api_base_url();
    let user = register_test_user(&client).await;

    let resp = client
        .post(format!("{base_url}/api/auth/request-otp"))
        .json(&json!({ "identifier": user.username }))
        .send()
        .await
        .expect("Failed to send request-otp request");
    assert_eq!(resp.status(), StatusCode::OK);

    // Age the stored code past its validity window
    let code = fetch_code(&pool, &user.phone).await;
    sqlx::query(
        "UPDATE one_time_codes SET created_at = NOW() - INTERVAL '6 minutes' WHERE phone = $1",
    )
    .bind(&user.phone)
    .execute(&pool)
    .await
    .expect("Failed to backdate code");

    let resp = client
        .post(format!("{base_url}/api/auth/verify-otp"))
        .json(&json!({ "identifier": user.username, "otp": code }))
        .send()
        .await
        .expect("Failed to send verify-otp request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid or expired OTP");

    // The expired code was consumed on the failed attempt
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM one_time_codes WHERE phone = $1",
    )
    .bind(&user.phone)
    .fetch_one(&pool)
    .await
    .expect("Failed to count codes");
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_request_otp_unknown_identifier() {
    let client = Client::new();

    let resp = client
        .post(format!("{}/api/auth/request-otp", api_base_url()))
        .json(&json!({ "identifier": format!("ghost{}", unique_suffix()) }))
        .send()
        .await
        .expect("Failed to send request-otp request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "No account found with this username or email");
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_verify_otp_rejects_wrong_code() {
    let client = Client::new();
    let pool = connect_pool().await;
    let base_url = api_base_url();
    let user = register_test_user(&client).await;

    let resp = client
        .post(format!("{base_url}/api/auth/request-otp"))
        .json(&json!({ "identifier": user.email }))
        .send()
        .await
        .expect("Failed to send request-otp request");
    assert_eq!(resp.status(), StatusCode::OK);

    // Submit a code that is guaranteed to differ from the issued one
    let code = fetch_code(&pool, &user.phone).await;
    let wrong = if code == "111111" { "222222" } else { "111111" };
    let resp = client
        .post(format!("{base_url}/api/auth/verify-otp"))
        .json(&json!({ "identifier": user.email, "otp": wrong }))
        .send()
        .await
        .expect("Failed to send verify-otp request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid or expired OTP");

    // A wrong attempt does not consume the real code
    let resp = client
        .post(format!("{base_url}/api/auth/verify-otp"))
        .json(&json!({ "identifier": user.email, "otp": code }))
        .send()
        .await
        .expect("Failed to send verify-otp request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running API server and database"]
async fn test_reset_password_rejects_short_and_bad_tokens() {
    let client = Client::new();
    let base_url = api_base_url();

    let resp = client
        .post(format!("{base_url}/api/auth/reset-password"))
        .json(&json!({ "resetToken": "irrelevant", "newPassword": "abc" }))
        .send()
        .await
        .expect("Failed to send reset-password request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Password must be at least 6 characters long");

    let resp = client
        .post(format!("{base_url}/api/auth/reset-password"))
        .json(&json!({ "resetToken": "not-a-jwt", "newPassword": "long-enough-1" }))
        .send()
        .await
        .expect("Failed to send reset-password request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["error"], "Invalid or expired reset token");
}
