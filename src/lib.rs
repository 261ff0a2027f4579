pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod router;
pub mod services;
pub mod validation;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use config::AppConfig;
use repositories::{SqliteRoleRepository, SqliteUserRepository};
use services::{AuthService, AuthTokenService, EmailService, Mailer, TokenSigner, UserService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub user_service: Arc<UserService>,
    pub auth_service: Arc<AuthService>,
    pub auth_token_service: Arc<AuthTokenService>,
    pub pool: sqlx::SqlitePool,
}

impl AppState {
    /// Wires repositories and services over `pool`.
    pub fn new(
        pool: sqlx::SqlitePool,
        config: AppConfig,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
        let role_repository = Arc::new(SqliteRoleRepository::new(pool.clone()));

        let user_service = Arc::new(UserService::new(
            user_repository.clone(),
            role_repository,
            config.admin_email.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(user_repository));

        let mailer = Mailer::new(email_service, config.mail_subject_prefix.clone());
        let auth_token_service = Arc::new(AuthTokenService::new(
            TokenSigner::new(&config.secret_key, config.token_expiry),
            user_service.clone(),
            mailer,
            config.base_url.clone(),
            config.admin_email.clone(),
        ));

        AppState {
            config: Arc::new(config),
            user_service,
            auth_service,
            auth_token_service,
            pool,
        }
    }
}
