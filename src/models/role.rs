use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Permission bits stored in `roles.permissions`.
pub struct Permission;

impl Permission {
    pub const FOLLOW: i64 = 1;
    pub const COMMENT: i64 = 2;
    pub const WRITE: i64 = 4;
    pub const MODERATE: i64 = 8;
    pub const ADMIN: i64 = 16;

    pub const ALL: i64 =
        Self::FOLLOW | Self::COMMENT | Self::WRITE | Self::MODERATE | Self::ADMIN;
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub permissions: i64,
}

impl Role {
    pub fn has_permission(&self, permission: i64) -> bool {
        self.permissions & permission == permission
    }
}

/// The roles every installation ships with.
pub struct RoleDefinition {
    pub name: &'static str,
    pub permissions: i64,
    pub is_default: bool,
}

pub const DEFAULT_ROLE_NAME: &str = "User";
pub const ADMIN_ROLE_NAME: &str = "Administrator";

pub const ROLE_DEFINITIONS: [RoleDefinition; 3] = [
    RoleDefinition {
        name: DEFAULT_ROLE_NAME,
        permissions: Permission::FOLLOW | Permission::COMMENT | Permission::WRITE,
        is_default: true,
    },
    RoleDefinition {
        name: "Moderator",
        permissions: Permission::FOLLOW
            | Permission::COMMENT
            | Permission::WRITE
            | Permission::MODERATE,
        is_default: false,
    },
    RoleDefinition {
        name: ADMIN_ROLE_NAME,
        permissions: Permission::ALL,
        is_default: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_default_role() {
        let defaults: Vec<_> = ROLE_DEFINITIONS.iter().filter(|r| r.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, DEFAULT_ROLE_NAME);
    }

    #[test]
    fn test_has_permission_requires_all_bits() {
        let role = Role {
            id: 1,
            name: "Moderator".to_string(),
            is_default: false,
            permissions: Permission::FOLLOW | Permission::MODERATE,
        };

        assert!(role.has_permission(Permission::MODERATE));
        assert!(role.has_permission(Permission::FOLLOW | Permission::MODERATE));
        assert!(!role.has_permission(Permission::MODERATE | Permission::ADMIN));
    }
}
