use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CSRF_TOKEN_KEY: &str = "csrf_token";
pub const CSRF_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("The CSRF token is missing.")]
    Missing,
    #[error("The CSRF token has expired.")]
    Expired,
    #[error("The CSRF token is invalid.")]
    Mismatch,
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        let status = match self {
            CsrfError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Form token as kept in the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() - self.created_at > CSRF_TOKEN_LIFETIME_SECS
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

fn prefix(token: &str) -> String {
    token.chars().take(8).collect()
}

/// Generate a new CSRF token and store in session
pub async fn generate_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token = CsrfToken::new();
    let value = token.value.clone();

    session.insert(CSRF_TOKEN_KEY, token).await?;

    debug!("Generated new CSRF token: {}", prefix(&value));
    Ok(value)
}

/// Returns the session's live token, minting one when absent or stale.
pub async fn get_or_create_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token: Option<CsrfToken> = session.get(CSRF_TOKEN_KEY).await?;

    match token {
        Some(existing_token) if !existing_token.is_expired() => Ok(existing_token.value),
        _ => generate_csrf_token(session).await,
    }
}

/// Checks the `csrf_token` field of a submitted form against the session.
///
/// A matching token is consumed and replaced, so each rendered form can be
/// submitted once.
pub async fn validate_csrf_form_field(session: &Session, form_token: &str) -> Result<(), CsrfError> {
    let stored_token: CsrfToken = match session.get(CSRF_TOKEN_KEY).await? {
        Some(token) => token,
        None => {
            warn!("No CSRF token in session for form validation");
            return Err(CsrfError::Missing);
        }
    };

    if form_token.is_empty() {
        warn!("Form submitted without a CSRF token");
        return Err(CsrfError::Missing);
    }

    if stored_token.is_expired() {
        warn!("CSRF token expired during form validation");
        return Err(CsrfError::Expired);
    }

    if form_token != stored_token.value {
        warn!(
            "CSRF form token mismatch: expected {}, got {}",
            prefix(&stored_token.value),
            prefix(form_token)
        );
        return Err(CsrfError::Mismatch);
    }

    generate_csrf_token(session).await?;
    Ok(())
}
