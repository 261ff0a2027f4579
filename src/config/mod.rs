pub mod session;

use std::env;

use chrono::Duration;

pub const DEFAULT_SECRET_KEY: &str = "hard to guess string";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0}")]
    Insecure(String),
}

/// Deployment profile, selected with `FLASKY_CONFIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Environment::Development),
            "testing" => Ok(Environment::Testing),
            "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "FLASKY_CONFIG",
                value: name.to_string(),
            }),
        }
    }

    pub fn default_database_url(&self) -> &'static str {
        match self {
            Environment::Development => "sqlite://data-dev.sqlite",
            Environment::Testing => "sqlite::memory:",
            Environment::Production => "sqlite://data.sqlite",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub use_ssl: bool,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub secret_key: String,
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    /// `None` means outgoing mail is only written to the log.
    pub mail: Option<MailSettings>,
    pub mail_subject_prefix: String,
    pub mail_sender: String,
    pub admin_email: Option<String>,
    pub token_expiry: Duration,
    pub force_https: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("FLASKY_CONFIG") {
            Ok(name) if !name.is_empty() => Environment::from_name(&name)?,
            _ => Environment::Development,
        };

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| environment.default_database_url().to_string());
        let port = parse_var("PORT", 5000)?;
        let token_expiry_secs: i64 = parse_var("TOKEN_EXPIRY_SECS", 3600)?;

        let mail = match env::var("MAIL_SERVER") {
            Ok(server) if !server.is_empty() => Some(MailSettings {
                server,
                port: parse_var("MAIL_PORT", 587)?,
                use_ssl: env_flag_enabled("MAIL_USE_SSL"),
                use_tls: env_flag_enabled("MAIL_USE_TLS"),
                username: env::var("MAIL_USERNAME").ok(),
                password: env::var("MAIL_PASSWORD").ok(),
            }),
            _ => None,
        };

        Ok(AppConfig {
            environment,
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.to_string()),
            database_url,
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            mail,
            mail_subject_prefix: env::var("FLASKY_MAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|_| "[Flasky]".to_string()),
            mail_sender: env::var("FLASKY_MAIL_SENDER")
                .unwrap_or_else(|_| "Flasky Admin <flasky@example.com>".to_string()),
            admin_email: env::var("FLASKY_ADMIN")
                .ok()
                .filter(|email| !email.is_empty())
                .map(|email| email.to_lowercase()),
            token_expiry: Duration::seconds(token_expiry_secs),
            force_https: env_flag_enabled("FORCE_HTTPS"),
        })
    }

    /// Settings used by the test suite: in-memory database, log-only mail.
    pub fn for_testing() -> Self {
        AppConfig {
            environment: Environment::Testing,
            secret_key: "testing secret key".to_string(),
            database_url: Environment::Testing.default_database_url().to_string(),
            base_url: "http://localhost".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            mail: None,
            mail_subject_prefix: "[Flasky]".to_string(),
            mail_sender: "Flasky Admin <flasky@example.com>".to_string(),
            admin_email: None,
            token_expiry: Duration::hours(1),
            force_https: false,
        }
    }
}

pub(crate) fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_names() {
        assert_eq!(
            Environment::from_name("development").unwrap(),
            Environment::Development
        );
        assert_eq!(
            Environment::from_name("default").unwrap(),
            Environment::Development
        );
        assert_eq!(
            Environment::from_name("Production").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_name("staging").is_err());
    }

    #[test]
    fn test_testing_profile_uses_memory_database() {
        let config = AppConfig::for_testing();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(config.mail.is_none());
        assert_eq!(config.token_expiry, Duration::hours(1));
    }
}
