use crate::config::session::REMEMBER_ME_EXPIRY;
use crate::error::AppError;
use crate::models::User;
use crate::services::UserService;
use tower_sessions::{session, Expiry, Session};

pub const USER_ID_KEY: &str = "user_id";
pub const AUTH_TIMESTAMP_KEY: &str = "auth_timestamp";

/// Binds `user` to the session under a fresh session id.
pub async fn login_user(
    session: &Session,
    user: &User,
    remember: bool,
) -> Result<(), session::Error> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;
    session
        .insert(AUTH_TIMESTAMP_KEY, chrono::Utc::now().timestamp())
        .await?;

    // A session reused across logins must not keep an earlier remember-me.
    if remember {
        session.set_expiry(Some(Expiry::OnInactivity(REMEMBER_ME_EXPIRY)));
    } else {
        session.set_expiry(None);
    }

    Ok(())
}

/// Forgets the logged in user but keeps the session, so a flash set
/// afterwards still reaches the next page.
pub async fn logout_user(session: &Session) -> Result<(), session::Error> {
    session.remove::<i64>(USER_ID_KEY).await?;
    session.remove::<i64>(AUTH_TIMESTAMP_KEY).await?;
    session.cycle_id().await
}

pub async fn current_user(
    session: &Session,
    user_service: &UserService,
) -> Result<Option<User>, AppError> {
    let Some(user_id) = session.get::<i64>(USER_ID_KEY).await? else {
        return Ok(None);
    };

    let user = user_service.find_user_by_id(user_id).await?;
    if user.is_none() {
        tracing::info!("Session refers to deleted user {}, clearing it", user_id);
        session.remove::<i64>(USER_ID_KEY).await?;
    }

    Ok(user)
}
