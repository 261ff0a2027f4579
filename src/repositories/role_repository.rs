use crate::models::role::{Role, RoleDefinition};
use crate::repositories::user_repository::{map_write_error, RepositoryResult};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Role>>;
    async fn find_default(&self) -> RepositoryResult<Option<Role>>;
    /// Creates the role if missing, then resets its permissions and default flag.
    async fn upsert(&self, definition: &RoleDefinition) -> RepositoryResult<Role>;
    async fn list_roles(&self) -> RepositoryResult<Vec<Role>>;
}

pub struct SqliteRoleRepository {
    pool: SqlitePool,
}

impl SqliteRoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for SqliteRoleRepository {
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, is_default, permissions FROM roles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, is_default, permissions FROM roles WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn find_default(&self) -> RepositoryResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, is_default, permissions FROM roles WHERE is_default = 1 ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn upsert(&self, definition: &RoleDefinition) -> RepositoryResult<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (name, is_default, permissions)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                is_default = excluded.is_default,
                permissions = excluded.permissions
            "#,
        )
        .bind(definition.name)
        .bind(definition.is_default)
        .bind(definition.permissions)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        self.find_by_name(definition.name)
            .await?
            .ok_or(crate::repositories::RepositoryError::NotFound)
    }

    async fn list_roles(&self) -> RepositoryResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, is_default, permissions FROM roles ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, ROLE_DEFINITIONS};
    use crate::test_utils::create_test_pool;

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_marks_default() {
        let pool = create_test_pool().await;
        let repo = SqliteRoleRepository::new(pool);

        for definition in ROLE_DEFINITIONS.iter() {
            repo.upsert(definition).await.unwrap();
        }
        for definition in ROLE_DEFINITIONS.iter() {
            repo.upsert(definition).await.unwrap();
        }

        let roles = repo.list_roles().await.unwrap();
        assert_eq!(roles.len(), ROLE_DEFINITIONS.len());

        let default = repo.find_default().await.unwrap().unwrap();
        assert_eq!(default.name, "User");

        let admin = repo.find_by_name("Administrator").await.unwrap().unwrap();
        assert!(admin.has_permission(Permission::ADMIN));
    }
}
