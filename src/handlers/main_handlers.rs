use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::handlers::page::PageContext;
use crate::models::{Role, User};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct IndexTemplate {
    page: PageContext,
    current_time: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "user.html")]
struct UserTemplate {
    page: PageContext,
    user: User,
    role_name: String,
    is_administrator: bool,
    viewer_is_administrator: bool,
    member_since: String,
}

/// GET /
pub async fn index(session: Session, CurrentUser(current): CurrentUser) -> Result<Response, AppError> {
    let template = IndexTemplate {
        page: PageContext::load(&session, current).await?,
        current_time: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
    };
    Ok(template.into_response())
}

/// GET /user/{username}
pub async fn user_profile(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(current): CurrentUser,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let user = state
        .user_service
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let role = state.user_service.role_for(&user).await?;
    let viewer_is_administrator = match &current {
        Some(viewer) => viewer_role_is_admin(&state, viewer).await?,
        None => false,
    };

    let template = UserTemplate {
        role_name: role
            .as_ref()
            .map(|r: &Role| r.name.clone())
            .unwrap_or_else(|| "None".to_string()),
        is_administrator: user.is_administrator(role.as_ref()),
        viewer_is_administrator,
        member_since: user.created_at.clone().unwrap_or_default(),
        user,
        page: PageContext::load(&session, current).await?,
    };
    Ok(template.into_response())
}

async fn viewer_role_is_admin(state: &AppState, viewer: &User) -> Result<bool, AppError> {
    let role = state.user_service.role_for(viewer).await?;
    Ok(viewer.is_administrator(role.as_ref()))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
