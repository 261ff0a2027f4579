use crate::auth::session::current_user;
use crate::error::AppError;
use crate::flash::flash;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

async fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session, AppError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, message)| {
            tracing::error!("Session unavailable: {}", message);
            AppError::InternalError
        })
}

/// The logged in user, if any.
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        Ok(CurrentUser(current_user(&session, &state.user_service).await?))
    }
}

/// A logged in user; anonymous requests are sent to the login page with the
/// current path as `next`.
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match current_user(&session, &state.user_service).await {
            Ok(Some(user)) => Ok(RequireUser(user)),
            Ok(None) => {
                flash(&session, LOGIN_REQUIRED_MESSAGE)
                    .await
                    .map_err(|e| AppError::from(e).into_response())?;

                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let location = format!("/login?next={}", urlencoding::encode(next));
                Err(Redirect::to(&location).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

/// Only anonymous visitors pass; logged in users go back to the index.
pub struct RequireAnonymous;

impl FromRequestParts<AppState> for RequireAnonymous {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match current_user(&session, &state.user_service).await {
            Ok(None) => Ok(RequireAnonymous),
            Ok(Some(_)) => Err(Redirect::to("/").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}
