pub mod role;
pub mod user;

pub use role::{Permission, Role, RoleDefinition, ROLE_DEFINITIONS};
pub use user::User;
