mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn test_post_without_csrf_token_is_rejected() {
    let mut app = TestApp::new().await;
    app.insert_user("john@example.com", "john", "cat12345", true).await;
    app.get("/login").await;

    let response = app
        .post_form(
            "/login",
            &[("email", "john@example.com"), ("password", "cat12345")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("The CSRF token is missing."));
}

#[tokio::test]
async fn test_post_with_wrong_csrf_token_is_rejected() {
    let mut app = TestApp::new().await;
    app.get("/register").await;

    let response = app
        .post_form(
            "/register",
            &[
                ("email", "john@example.com"),
                ("username", "john"),
                ("password", "cat12345"),
                ("password2", "cat12345"),
                ("csrf_token", "forged"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app
        .state
        .user_service
        .find_user_by_email("john@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_post_without_session_is_rejected() {
    let mut app = TestApp::new().await;

    let response = app
        .post_form("/reset", &[("email", "john@example.com"), ("csrf_token", "x")])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn test_csrf_token_cannot_be_replayed() {
    let mut app = TestApp::new().await;
    app.insert_user("john@example.com", "john", "cat12345", true).await;

    let page = app.get("/login").await;
    let token = page
        .body
        .split(r#"name="csrf_token" value=""#)
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap()
        .to_string();

    let fields = [
        ("email", "john@example.com"),
        ("password", "wrong123"),
        ("csrf_token", token.as_str()),
    ];
    let first = app.post_form("/login", &fields).await;
    assert_eq!(first.status, StatusCode::OK);

    let replay = app.post_form("/login", &fields).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
}
