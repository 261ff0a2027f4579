use crate::models::role::{Role, ADMIN_ROLE_NAME, ROLE_DEFINITIONS};
use crate::models::user::User;
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::{RepositoryError, UniqueField, UserRepository};
use crate::validation::{normalize_email, validate_email, validate_password, validate_username};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),
    #[error("Password too weak (minimum 8 characters)")]
    WeakPassword,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("User not found")]
    UserNotFound,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already in use")]
    UsernameTaken,
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub confirmed: bool,
}

pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub new_password: String,
    pub new_password_confirm: Option<String>,
}

pub struct UpdateEmailRequest {
    pub user_id: i64,
    pub new_email: String,
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    admin_email: Option<String>,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            repository,
            roles,
            admin_email: admin_email.map(|email| normalize_email(&email)),
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        let email = normalize_email(&request.email);
        validate_email(&email).map_err(|_| UserServiceError::InvalidEmail)?;
        validate_username(&request.username).map_err(UserServiceError::InvalidUsername)?;

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        validate_password(&request.password).map_err(|_| UserServiceError::WeakPassword)?;

        let password_hash = hash_password(&request.password)?;
        let role_id = self.initial_role(&email).await?.map(|role| role.id);

        // Uniqueness of email and username is left to the table constraints.
        let user = self
            .repository
            .create_user(
                &email,
                &request.username,
                &password_hash,
                request.confirmed,
                role_id,
            )
            .await
            .map_err(map_unique)?;

        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    async fn initial_role(&self, email: &str) -> Result<Option<Role>, UserServiceError> {
        let role = if self.admin_email.as_deref() == Some(email) {
            self.roles.find_by_name(ADMIN_ROLE_NAME).await?
        } else {
            self.roles.find_default().await?
        };

        if role.is_none() {
            tracing::warn!("No role available for new user {}; run `cli roles insert`", email);
        }

        Ok(role)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .repository
            .find_by_email(&normalize_email(email))
            .await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_username(username).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn confirm_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.confirm(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn update_password(
        &self,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserServiceError> {
        if let Some(ref confirm) = request.new_password_confirm {
            if request.new_password != *confirm {
                return Err(UserServiceError::PasswordMismatch);
            }
        }

        validate_password(&request.new_password).map_err(|_| UserServiceError::WeakPassword)?;

        let password_hash = hash_password(&request.new_password)?;

        match self
            .repository
            .update_password(request.user_id, &password_hash)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn update_email(&self, request: UpdateEmailRequest) -> Result<(), UserServiceError> {
        let new_email = normalize_email(&request.new_email);
        validate_email(&new_email).map_err(|_| UserServiceError::InvalidEmail)?;

        match self
            .repository
            .update_email(request.user_id, &new_email)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(map_unique(e)),
        }
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        verify_password(password, password_hash)
    }

    /// The role `user` belongs to, if any.
    pub async fn role_for(&self, user: &User) -> Result<Option<Role>, UserServiceError> {
        match user.role_id {
            Some(role_id) => Ok(self.roles.find_by_id(role_id).await?),
            None => Ok(None),
        }
    }

    /// Creates or refreshes the built-in roles.
    pub async fn insert_roles(&self) -> Result<Vec<Role>, UserServiceError> {
        let mut roles = Vec::with_capacity(ROLE_DEFINITIONS.len());
        for definition in ROLE_DEFINITIONS.iter() {
            roles.push(self.roles.upsert(definition).await?);
        }
        Ok(roles)
    }
}

fn map_unique(err: RepositoryError) -> UserServiceError {
    match err {
        RepositoryError::AlreadyExists(UniqueField::Email) => UserServiceError::EmailTaken,
        RepositoryError::AlreadyExists(UniqueField::Username) => UserServiceError::UsernameTaken,
        e => UserServiceError::RepositoryError(e),
    }
}

pub fn hash_password(password: &str) -> Result<String, UserServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserServiceError::HashingError(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    } else {
        false
    }
}
