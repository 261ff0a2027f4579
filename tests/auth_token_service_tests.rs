use flasky::{
    config::AppConfig,
    services::{
        user_service::CreateUserRequest, TokenPurpose, TokenSigner,
    },
    test_utils::test_helpers::{self, RecordingEmailService},
    AppState,
};
use std::sync::Arc;

async fn setup(config: AppConfig) -> (AppState, Arc<RecordingEmailService>) {
    let pool = test_helpers::create_test_db().await.unwrap();
    let (state, recorder) = test_helpers::test_app_state(pool, config);
    state.user_service.insert_roles().await.unwrap();
    (state, recorder)
}

fn registration(email: &str, username: &str) -> CreateUserRequest {
    CreateUserRequest {
        email: email.to_string(),
        username: username.to_string(),
        password: "cat12345".to_string(),
        password_confirm: Some("cat12345".to_string()),
        confirmed: false,
    }
}

/// Pulls the last path segment of the first link in `body` under `prefix`.
fn token_from(body: &str, prefix: &str) -> String {
    let start = body.find(prefix).expect("link present") + prefix.len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

#[tokio::test]
async fn test_register_sends_confirmation_and_admin_notice() {
    let mut config = AppConfig::for_testing();
    config.admin_email = Some("admin@example.com".to_string());
    let (state, recorder) = setup(config).await;

    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let sent = recorder.wait_for(2).await;
    assert_eq!(sent.len(), 2);

    let confirmation = sent.iter().find(|m| m.to == "john@example.com").unwrap();
    assert_eq!(confirmation.subject, "[Flasky] Confirm Your Account");
    assert!(confirmation.text_body.contains("http://localhost/confirm/"));

    let notice = sent.iter().find(|m| m.to == "admin@example.com").unwrap();
    assert_eq!(notice.subject, "[Flasky] New User");
    assert!(notice.text_body.contains(&user.username));
}

#[tokio::test]
async fn test_confirmation_token_round_trip() {
    let (state, recorder) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let sent = recorder.wait_for(1).await;
    let token = token_from(&sent[0].text_body, "http://localhost/confirm/");

    assert!(state.auth_token_service.confirm(&user, &token).await.unwrap());
    let reloaded = state.user_service.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(reloaded.confirmed);
}

#[tokio::test]
async fn test_confirmation_token_of_another_user_is_rejected() {
    let (state, _) = setup(AppConfig::for_testing()).await;
    let john = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();
    let susan = state
        .auth_token_service
        .register_user(registration("susan@example.com", "susan"))
        .await
        .unwrap();

    let token = state.auth_token_service.tokens().confirmation_token(john.id).unwrap();

    assert!(!state.auth_token_service.confirm(&susan, &token).await.unwrap());
    let reloaded = state.user_service.find_user_by_id(susan.id).await.unwrap().unwrap();
    assert!(!reloaded.confirmed);
}

#[tokio::test]
async fn test_expired_confirmation_token_is_rejected() {
    let (state, _) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let token = state
        .auth_token_service
        .tokens()
        .sign_with_expiry(
            TokenPurpose::Confirm { user_id: user.id },
            chrono::Duration::seconds(-1),
        )
        .unwrap();

    assert!(!state.auth_token_service.confirm(&user, &token).await.unwrap());
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (state, _) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let foreign = TokenSigner::new("another secret", chrono::Duration::hours(1))
        .confirmation_token(user.id)
        .unwrap();

    assert!(!state.auth_token_service.confirm(&user, &foreign).await.unwrap());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (state, recorder) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();
    recorder.wait_for(1).await;

    let handle = state
        .auth_token_service
        .send_password_reset("JOHN@example.com")
        .await
        .unwrap()
        .expect("known address gets a reset mail");
    handle.await.unwrap();

    let sent = recorder.sent();
    let reset = sent.last().unwrap();
    assert_eq!(reset.subject, "[Flasky] Reset Your Password");
    let token = token_from(&reset.text_body, "http://localhost/reset/");

    assert!(state
        .auth_token_service
        .reset_password(&token, "dog12345")
        .await
        .unwrap());

    let reloaded = state.user_service.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(state.user_service.verify_password("dog12345", &reloaded.password_hash));
    assert!(!state
        .auth_token_service
        .reset_password("not-a-token", "dog12345")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_password_reset_for_unknown_address_sends_nothing() {
    let (state, recorder) = setup(AppConfig::for_testing()).await;

    let handle = state
        .auth_token_service
        .send_password_reset("nobody@example.com")
        .await
        .unwrap();

    assert!(handle.is_none());
    assert!(recorder.sent().is_empty());
}

#[tokio::test]
async fn test_confirmation_token_cannot_reset_password() {
    let (state, _) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let token = state.auth_token_service.tokens().confirmation_token(user.id).unwrap();
    assert!(!state
        .auth_token_service
        .reset_password(&token, "dog12345")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_email_change_flow() {
    let (state, recorder) = setup(AppConfig::for_testing()).await;
    let user = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();
    recorder.wait_for(1).await;

    state
        .auth_token_service
        .request_email_change(&user, "John2@Example.com")
        .unwrap()
        .await
        .unwrap();

    let sent = recorder.sent();
    let change = sent.last().unwrap();
    assert_eq!(change.to, "john2@example.com");
    let token = token_from(&change.text_body, "http://localhost/change-email/");

    assert!(state.auth_token_service.change_email(&user, &token).await.unwrap());
    let reloaded = state.user_service.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.email, "john2@example.com");
}

#[tokio::test]
async fn test_email_change_to_address_taken_meanwhile_fails() {
    let (state, _) = setup(AppConfig::for_testing()).await;
    let john = state
        .auth_token_service
        .register_user(registration("john@example.com", "john"))
        .await
        .unwrap();

    let token = state
        .auth_token_service
        .tokens()
        .email_change_token(john.id, "susan@example.com")
        .unwrap();

    state
        .auth_token_service
        .register_user(registration("susan@example.com", "susan"))
        .await
        .unwrap();

    assert!(!state.auth_token_service.change_email(&john, &token).await.unwrap());
    let reloaded = state.user_service.find_user_by_id(john.id).await.unwrap().unwrap();
    assert_eq!(reloaded.email, "john@example.com");
}
