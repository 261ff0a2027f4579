use crate::auth::session::current_user;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Sends logged in but unconfirmed users to `/unconfirmed`.
pub async fn require_confirmed(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    match current_user(&session, &state.user_service).await {
        Ok(Some(user)) if !user.confirmed => Redirect::to("/unconfirmed").into_response(),
        Ok(_) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
