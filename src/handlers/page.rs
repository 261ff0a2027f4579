use crate::error::AppError;
use crate::flash::take_flashes;
use crate::middleware::csrf::get_or_create_csrf_token;
use crate::models::User;
use tower_sessions::Session;

/// What the shared layout needs on every page.
#[derive(Debug, Default)]
pub struct PageContext {
    pub current_user: Option<User>,
    pub flashes: Vec<String>,
    pub csrf_token: String,
}

impl PageContext {
    /// Drains pending flash messages, so build it once per rendered page.
    pub async fn load(session: &Session, current_user: Option<User>) -> Result<Self, AppError> {
        Ok(Self {
            current_user,
            flashes: take_flashes(session).await?,
            csrf_token: get_or_create_csrf_token(session).await?,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.current_user.as_ref().map(|user| user.username.as_str())
    }
}
