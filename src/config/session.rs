use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    Expiry, SessionManagerLayer, SessionStore,
};
use tracing::warn;

use super::{AppConfig, ConfigError, Environment, DEFAULT_SECRET_KEY};

/// Signed session layer over any session store.
pub type SessionLayer<S> = SessionManagerLayer<S, SignedCookie>;

/// Inactivity window granted by "keep me logged in".
pub const REMEMBER_ME_EXPIRY: Duration = Duration::days(30);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub expiry: Duration,
    pub name: String,
}

impl SessionConfig {
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production() {
            SessionConfig {
                secure: true,
                http_only: true,
                same_site: SameSite::Strict,
                expiry: Duration::hours(2),
                name: "__Host-session".to_string(),
            }
        } else {
            SessionConfig {
                secure: false,
                http_only: true,
                same_site: SameSite::Lax,
                expiry: Duration::days(1),
                name: "session".to_string(),
            }
        }
    }

    pub fn create_layer<S: SessionStore>(&self, store: S, secret_key: &str) -> SessionLayer<S> {
        SessionManagerLayer::new(store)
            .with_secure(self.secure)
            .with_http_only(self.http_only)
            .with_same_site(self.same_site)
            .with_name(self.name.clone())
            .with_expiry(Expiry::OnInactivity(self.expiry))
            .with_signed(load_session_key(secret_key))
    }
}

pub fn validate_production_config(config: &AppConfig) -> Result<(), ConfigError> {
    if !config.environment.is_production() {
        return Ok(());
    }

    if !config.force_https {
        return Err(ConfigError::Insecure(
            "Production environment requires HTTPS. Set FORCE_HTTPS=true".to_string(),
        ));
    }

    let secret = &config.secret_key;
    if decode_secret_bytes(secret).len() < 64 {
        return Err(ConfigError::Insecure(
            "SECRET_KEY must be at least 64 bytes in production".to_string(),
        ));
    }

    let lowered = secret.to_ascii_lowercase();
    if secret == DEFAULT_SECRET_KEY
        || lowered.contains("example")
        || lowered.contains("changeme")
        || lowered.contains("default")
    {
        return Err(ConfigError::Insecure(
            "SECRET_KEY appears to be a default value. Generate a secure secret!".to_string(),
        ));
    }

    Ok(())
}

fn load_session_key(secret: &str) -> Key {
    if secret.is_empty() {
        warn!("SECRET_KEY is empty; generating ephemeral session key");
        return Key::generate();
    }
    key_from_secret_bytes(&decode_secret_bytes(secret))
}

fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}

fn key_from_secret_bytes(bytes: &[u8]) -> Key {
    if bytes.len() >= 64 {
        Key::from(&bytes[..64])
    } else {
        let digest = Sha512::digest(bytes);
        Key::from(digest.as_slice())
    }
}
