mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn health_answers_without_session() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("pong"));
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/experts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/api/experts", "not-a-session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_expert_can_log_in_and_out() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, expert) = app
        .post(
            "/api/create-expert",
            &admin,
            json!({
                "email": "Ayse@Rehber.test",
                "password": "secret-pass",
                "firstName": "Ayşe",
                "lastName": "Yılmaz",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expert["email"], "ayse@rehber.test");

    let (status, login) = app
        .send(
            Method::POST,
            "/api/session/login",
            None,
            Some(json!({ "email": "ayse@rehber.test", "password": "secret-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["role"], "expert");
    assert_eq!(login["uid"], expert["id"]);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/session/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "expert");

    let (status, body) = app
        .send(Method::POST, "/api/session/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = app.get("/api/session/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    let admin = app.admin();
    app.post(
        "/api/create-family",
        &admin,
        json!({ "email": "aile@rehber.test", "password": "secret-pass", "familyName": "Demir" }),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/session/login",
            None,
            Some(json!({ "email": "aile@rehber.test", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_account_is_conflict() {
    let app = TestApp::new();
    let admin = app.admin();
    let body = json!({ "email": "aile@rehber.test", "password": "secret-pass", "familyName": "Demir" });

    let (status, _) = app.post("/api/create-family", &admin, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/api/create-family", &admin, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn non_admin_cannot_create_accounts() {
    let app = TestApp::new();
    let (_, family) = app.family("aile@rehber.test", "Demir");

    let (status, body) = app
        .post(
            "/api/create-expert",
            &family,
            json!({ "email": "x@rehber.test", "password": "secret-pass", "firstName": "X", "lastName": "Y" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("manage_accounts"));
}

#[tokio::test]
async fn session_without_role_is_forbidden() {
    let app = TestApp::new();
    let (_, token) = app.session("norole@rehber.test", None);

    let (status, _) = app.get("/api/experts", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/profile", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_is_bad_request_with_error_body() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, body) = app
        .post("/api/assign-families", &admin, json!({ "expertEmail": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
