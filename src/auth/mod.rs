pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod session;

pub use extractors::{CurrentUser, RequireAnonymous, RequireUser};
pub use session::{current_user, login_user, logout_user};
