mod common;

use baims_api::{
    AppConfig,
    auth::{Claims, decode_token, issue_token},
    config::Env,
    scope::PrincipalKind,
    storage::MockStorageService,
};
use chrono::Utc;
use common::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn login_repo() -> MockRepo {
    seeded_repo()
        .with_login(PrincipalKind::User, 5, "ana", "secret-5", true)
        .with_login(PrincipalKind::User, 9, "dormant", "secret-9", false)
        .with_login(PrincipalKind::Ba, 7, "bea", "secret-7", true)
        .with_login(PrincipalKind::Admin, 1, "root", "secret-1", true)
}

fn production() -> AppConfig {
    AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    }
}

// --- LOGIN FLOWS ---

#[tokio::test]
async fn test_user_login_issues_a_usable_token() {
    let app = spawn_app(login_repo()).await;
    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "ana", "password": "secret-5" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], json!("user"));
    assert_eq!(body["expires_in"], json!(86_400));
    assert_eq!(body["profile"]["agency_id"], json!(ACME));

    let token = body["token"].as_str().unwrap();
    let claims = decode_token(&AppConfig::default(), token).unwrap();
    assert_eq!(claims.sub, 5);
    assert_eq!(claims.kind, PrincipalKind::User);

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["id"], json!(5));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let app = spawn_app(login_repo()).await;

    for payload in [
        json!({ "username": "ana", "password": "wrong-password" }),
        json!({ "username": "nobody", "password": "secret-5" }),
    ] {
        let response = app
            .client
            .post(app.url("/login"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], json!("authentication required"));
    }
}

#[tokio::test]
async fn test_inactive_account_is_forbidden() {
    let app = spawn_app(login_repo()).await;
    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "dormant", "password": "secret-9" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_each_gateway_checks_its_own_principal_table() {
    let app = spawn_app(login_repo()).await;

    // A field agent's credentials are unknown to the office login.
    let response = app
        .client
        .post(app.url("/login"))
        .json(&json!({ "username": "bea", "password": "secret-7" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .post(app.url("/ba-login"))
        .json(&json!({ "username": "bea", "password": "secret-7" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], json!("ba"));
    assert_eq!(body["profile"]["project_ids"], json!([SURVEY, ARCHIVED]));

    let response = app
        .client
        .post(app.url("/admin-login"))
        .json(&json!({ "username": "root", "password": "secret-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["profile"]["superuser"], json!(true));
}

// --- TOKEN VALIDATION ---

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app(seeded_repo()).await;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: 5,
        kind: PrincipalKind::User,
        iat: now - 7_200,
        exp: now - 3_600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes()),
    )
    .unwrap();

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let app = spawn_app(seeded_repo()).await;
    let foreign = AppConfig {
        jwt_secret: "not-the-server-secret".to_string(),
        ..AppConfig::default()
    };
    let token = issue_token(&foreign, PrincipalKind::User, 5).unwrap();

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_removed_principal_is_rejected() {
    let app = spawn_app(seeded_repo()).await;
    // Valid signature, but no such BA any more.
    let token = issue_token(&AppConfig::default(), PrincipalKind::Ba, 404).unwrap();

    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_kind_selects_the_principal() {
    let app = spawn_app(seeded_repo()).await;
    let token = issue_token(&AppConfig::default(), PrincipalKind::Ba, 7).unwrap();

    let body: Value = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["kind"], json!("ba"));
    assert_eq!(body["id"], json!(7));
}

// --- LOCAL BYPASS ---

#[tokio::test]
async fn test_principal_header_is_ignored_in_production() {
    let app = spawn_app_with(seeded_repo(), MockStorageService::new(), production()).await;
    let response = app.get_as(ACME_USER, "/profile").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = issue_token(&production(), PrincipalKind::User, 5).unwrap();
    let response = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_principal_header_falls_back_to_token() {
    let app = spawn_app(seeded_repo()).await;
    let response = app.get_as("superuser", "/profile").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
