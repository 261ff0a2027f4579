pub mod test_helpers {
    use crate::config::{session::SessionConfig, AppConfig};
    use crate::models::ROLE_DEFINITIONS;
    use crate::repositories::{RoleRepository, SqliteRoleRepository};
    use crate::services::email_service::{EmailError, EmailService, OutgoingEmail};
    use crate::services::user_service::hash_password;
    use crate::{router, AppState};
    use async_trait::async_trait;
    use axum::Router;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tower_sessions::MemoryStore;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when you need to test features that don't work with in-memory databases
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Insert the built-in roles
    pub async fn seed_roles(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let roles = SqliteRoleRepository::new(pool.clone());
        for definition in ROLE_DEFINITIONS.iter() {
            roles.upsert(definition).await.map_err(|e| {
                sqlx::Error::Configuration(format!("Role seeding failed: {}", e).into())
            })?;
        }
        Ok(())
    }

    /// Insert a test user with hashed password and the default role, if seeded
    pub async fn insert_test_user(
        pool: &SqlitePool,
        email: &str,
        username: &str,
        password: &str,
        confirmed: bool,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, password_hash, confirmed, role_id)
            VALUES (?, ?, ?, ?, (SELECT id FROM roles WHERE is_default = 1 LIMIT 1))
            "#,
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(confirmed)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Keeps every message instead of delivering it.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl RecordingEmailService {
        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        /// Polls until `count` messages have arrived or about a second passes.
        pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
            for _ in 0..100 {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.sent()
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            self.sent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(email);
            Ok(())
        }
    }

    /// App state over `pool` whose outgoing mail lands in the returned recorder.
    pub fn test_app_state(
        pool: SqlitePool,
        config: AppConfig,
    ) -> (AppState, Arc<RecordingEmailService>) {
        let recorder = Arc::new(RecordingEmailService::default());
        let state = AppState::new(pool, config, recorder.clone());
        (state, recorder)
    }

    /// Full router with an in-memory session store.
    pub fn build_test_app(state: AppState) -> Router {
        let session_layer = SessionConfig::for_environment(state.config.environment)
            .create_layer(MemoryStore::default(), &state.config.secret_key);
        router::build_router(state).layer(session_layer)
    }
}

// Note: This is test-only code. Panic on error is acceptable in tests.
#[cfg(test)]
pub async fn create_test_pool() -> sqlx::SqlitePool {
    match test_helpers::create_test_db().await {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
