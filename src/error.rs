use crate::handlers::page::PageContext;
use crate::middleware::csrf::CsrfError;
use crate::services::{AuthServiceError, AuthTokenError, UserServiceError};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Csrf(#[from] CsrfError),

    #[error(transparent)]
    UserService(#[from] UserServiceError),

    #[error(transparent)]
    AuthService(#[from] AuthServiceError),

    #[error(transparent)]
    AuthToken(#[from] AuthTokenError),

    #[error("Not found")]
    NotFound,

    #[error("Internal server error")]
    InternalError,
}

#[derive(Template)]
#[template(path = "404.html")]
struct NotFoundTemplate {
    page: PageContext,
}

#[derive(Template)]
#[template(path = "500.html")]
struct ServerErrorTemplate {
    page: PageContext,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, rendered) = match self {
            AppError::Csrf(e) => return e.into_response(),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                NotFoundTemplate {
                    page: PageContext::default(),
                }
                .render(),
            ),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ServerErrorTemplate {
                        page: PageContext::default(),
                    }
                    .render(),
                )
            }
        };

        match rendered {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, status.canonical_reason().unwrap_or("Error")).into_response()
            }
        }
    }
}
