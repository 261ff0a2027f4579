use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::role::{Permission, Role};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub confirmed: bool,
    pub role_id: Option<i64>,
    pub created_at: Option<String>,
}

impl User {
    /// Whether `role` (the role this user belongs to) grants `permission`.
    ///
    /// A user without a role can do nothing.
    pub fn can(&self, role: Option<&Role>, permission: i64) -> bool {
        match role {
            Some(role) if Some(role.id) == self.role_id => role.has_permission(permission),
            _ => false,
        }
    }

    pub fn is_administrator(&self, role: Option<&Role>) -> bool {
        self.can(role, Permission::ADMIN)
    }
}
