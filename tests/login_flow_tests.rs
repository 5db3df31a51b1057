//! End-to-end tests for the login flow: first-login registration, the
//! concurrent-registration race, account status, and the allow-list.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use quilld::config::Config;
use quilld::entities::users;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app_with_allowed(allowed: &[&str]) -> (Arc<quilld::api::AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("quilld-login-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.database.url = format!("sqlite:{}", db_path.display());
    config.auth.token_secret = "login-test-secret-0123456789abcdef".to_string();
    config.auth.allowed_usernames = allowed.iter().map(ToString::to_string).collect();

    let state = quilld::api::create_app_state_from_config(config)
        .await
        .expect("failed to create app state");
    let router = quilld::api::router(state.clone()).await;
    (state, router)
}

async fn spawn_app() -> (Arc<quilld::api::AppState>, Router) {
    spawn_app_with_allowed(&[]).await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "username": username, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn user_count(state: &quilld::api::AppState) -> u64 {
    users::Entity::find()
        .count(&state.store().conn)
        .await
        .unwrap()
}

async fn set_status(state: &quilld::api::AppState, username: &str, status: i16) {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(&state.store().conn)
        .await
        .unwrap()
        .unwrap();

    let mut active: users::ActiveModel = user.into();
    active.status = Set(status);
    active.update(&state.store().conn).await.unwrap();
}

#[tokio::test]
async fn concurrent_first_logins_create_one_account() {
    let (state, app) = spawn_app().await;

    let (a, b) = tokio::join!(
        login(&app, "edgar", "correct horse"),
        login(&app, "edgar", "correct horse"),
    );

    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    // Exactly one request created the row; the other verified against
    // it, whether it lost the insert race or simply ran second.
    let mut outcomes = [
        a.1["data"]["outcome"].as_str().unwrap().to_string(),
        b.1["data"]["outcome"].as_str().unwrap().to_string(),
    ];
    outcomes.sort();
    assert_eq!(outcomes, ["first_login_registered", "success"]);

    assert_eq!(user_count(&state).await, 1);
}

#[tokio::test]
async fn racing_logins_with_different_passwords_keep_one_winner() {
    let (state, app) = spawn_app().await;

    let (a, b) = tokio::join!(
        login(&app, "edgar", "password-one"),
        login(&app, "edgar", "password-two"),
    );

    // Whichever request registered the account wins; the other fails
    // password verification against the stored hash.
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::UNAUTHORIZED]);

    assert_eq!(user_count(&state).await, 1);
}

#[tokio::test]
async fn disabled_account_cannot_login() {
    let (state, app) = spawn_app().await;
    login(&app, "edgar", "correct horse").await;

    set_status(&state, "edgar", 0).await;

    let (status, body) = login(&app, "edgar", "correct horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is disabled");

    // A wrong password on a disabled account reads as bad credentials:
    // the password check comes before the status check.
    let (status, body) = login(&app, "edgar", "wrong horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn any_nonzero_status_allows_login() {
    let (state, app) = spawn_app().await;
    login(&app, "edgar", "correct horse").await;

    set_status(&state, "edgar", 0).await;
    let (status, _) = login(&app, "edgar", "correct horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    set_status(&state, "edgar", 2).await;
    let (status, body) = login(&app, "edgar", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["status"], "enabled");
}

#[tokio::test]
async fn allow_list_restricts_who_may_log_in() {
    let (state, app) = spawn_app_with_allowed(&["author"]).await;

    let (status, body) = login(&app, "intruder", "whatever-pass").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
    assert_eq!(body["message"], "Username is not allowed to log in");

    // The rejected username must not have been registered.
    assert_eq!(user_count(&state).await, 0);

    let (status, body) = login(&app, "author", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "first_login_registered");
}

#[tokio::test]
async fn username_is_trimmed_before_matching() {
    let (state, app) = spawn_app().await;
    let (_, first) = login(&app, "edgar", "correct horse").await;

    let (status, body) = login(&app, "  edgar  ", "correct horse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "success");
    assert_eq!(body["data"]["user"]["id"], first["data"]["user"]["id"]);

    assert_eq!(user_count(&state).await, 1);
}

#[tokio::test]
async fn store_failure_returns_a_generic_error() {
    let (state, app) = spawn_app().await;

    // Drop the table so the login lookup fails inside the store.
    state
        .store()
        .conn
        .execute_unprepared("DROP TABLE users")
        .await
        .unwrap();

    let (status, body) = login(&app, "edgar", "correct horse").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);

    // The underlying failure is logged server-side, never shown to the
    // client.
    assert_eq!(body["message"], "A database error occurred");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn token_expiry_matches_configured_ttl() {
    let (_, app) = spawn_app().await;

    // Token timestamps are whole Unix seconds; truncate the reference
    // instant the same way, or a login that crosses a second boundary
    // pushes the measured TTL past the configured one.
    let before = chrono::DateTime::from_timestamp(chrono::Utc::now().timestamp(), 0).unwrap();
    let (_, body) = login(&app, "edgar", "correct horse").await;

    let expires_at =
        chrono::DateTime::parse_from_rfc3339(body["data"]["expires_at"].as_str().unwrap()).unwrap();
    let ttl = expires_at.signed_duration_since(before);

    // Default TTL is seven days. With both sides in whole seconds the
    // lower bound is exact; the slack covers login runtime.
    assert!(ttl >= chrono::Duration::days(7));
    assert!(ttl < chrono::Duration::days(7) + chrono::Duration::seconds(30));
}
