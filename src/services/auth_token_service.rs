use crate::models::User;
use crate::services::email_service::{EmailError, Mailer};
use crate::services::email_templates::{
    ChangeEmailEmail, ConfirmAccountEmail, NewUserEmail, ResetPasswordEmail,
};
use crate::services::signed_token::{TokenError, TokenSigner};
use crate::services::user_service::{
    CreateUserRequest, UpdateEmailRequest, UpdatePasswordRequest, UserService, UserServiceError,
};
use crate::validation::normalize_email;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum AuthTokenError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Email error: {0}")]
    EmailError(#[from] EmailError),
    #[error("User service error: {0}")]
    UserServiceError(#[from] UserServiceError),
}

/// Issues and redeems the signed links sent by email: account confirmation,
/// password reset and email change.
pub struct AuthTokenService {
    tokens: TokenSigner,
    user_service: Arc<UserService>,
    mailer: Mailer,
    base_url: String,
    admin_email: Option<String>,
}

impl AuthTokenService {
    pub fn new(
        tokens: TokenSigner,
        user_service: Arc<UserService>,
        mailer: Mailer,
        base_url: impl Into<String>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            tokens,
            user_service,
            mailer,
            base_url: base_url.into(),
            admin_email,
        }
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Creates the account, mails a confirmation link and tells the admin.
    ///
    /// The account stands even when the mail cannot be queued; the user can
    /// ask for a new confirmation link from `/confirm`.
    pub async fn register_user(&self, request: CreateUserRequest) -> Result<User, AuthTokenError> {
        let user = self.user_service.create_user(request).await?;

        queue_or_log("confirmation email", self.send_confirmation(&user));

        if let Some(admin) = &self.admin_email {
            let notice = NewUserEmail {
                username: user.username.clone(),
                email: user.email.clone(),
            };
            queue_or_log(
                "new user notice",
                self.mailer
                    .send_email(admin, "New User", &notice)
                    .map_err(AuthTokenError::from),
            );
        }

        Ok(user)
    }

    pub fn send_confirmation(&self, user: &User) -> Result<JoinHandle<()>, AuthTokenError> {
        let token = self.tokens.confirmation_token(user.id)?;
        let template = ConfirmAccountEmail {
            username: user.username.clone(),
            confirm_url: format!("{}/confirm/{}", self.base_url, token),
        };

        tracing::info!("Sending confirmation email to user {}", user.id);
        Ok(self
            .mailer
            .send_email(&user.email, "Confirm Your Account", &template)?)
    }

    /// Marks `user` confirmed when `token` is a live confirmation token for them.
    ///
    /// Returns `Ok(false)` for a bad, expired or foreign token.
    pub async fn confirm(&self, user: &User, token: &str) -> Result<bool, AuthTokenError> {
        let user_id = match self.tokens.verify_confirmation(token) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::info!("Rejected confirmation token for user {}: {}", user.id, e);
                return Ok(false);
            }
        };

        if user_id != user.id {
            tracing::warn!(
                "User {} presented a confirmation token issued for user {}",
                user.id,
                user_id
            );
            return Ok(false);
        }

        self.user_service.confirm_user(user.id).await?;
        Ok(true)
    }

    /// Mails a reset link if `email` belongs to an account.
    ///
    /// Unknown addresses are not reported to the caller.
    pub async fn send_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<JoinHandle<()>>, AuthTokenError> {
        let Some(user) = self.user_service.find_user_by_email(email).await? else {
            tracing::info!("Password reset requested for unknown address");
            return Ok(None);
        };

        let token = self.tokens.reset_token(user.id)?;
        let template = ResetPasswordEmail {
            username: user.username.clone(),
            reset_url: format!("{}/reset/{}", self.base_url, token),
        };

        Ok(Some(self.mailer.send_email(
            &user.email,
            "Reset Your Password",
            &template,
        )?))
    }

    /// Sets a new password for the user named by a live reset token.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<bool, AuthTokenError> {
        let user_id = match self.tokens.verify_reset(token) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::info!("Rejected password reset token: {}", e);
                return Ok(false);
            }
        };

        let request = UpdatePasswordRequest {
            user_id,
            new_password: new_password.to_string(),
            new_password_confirm: None,
        };

        match self.user_service.update_password(request).await {
            Ok(()) => Ok(true),
            Err(UserServiceError::UserNotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Mails a link to `new_email` that proves the user controls it.
    pub fn request_email_change(
        &self,
        user: &User,
        new_email: &str,
    ) -> Result<JoinHandle<()>, AuthTokenError> {
        let new_email = normalize_email(new_email);
        let token = self.tokens.email_change_token(user.id, &new_email)?;
        let template = ChangeEmailEmail {
            username: user.username.clone(),
            change_url: format!("{}/change-email/{}", self.base_url, token),
        };

        Ok(self
            .mailer
            .send_email(&new_email, "Confirm your email address", &template)?)
    }

    /// Applies an email change for `user` when `token` was issued to them and
    /// the new address is still free.
    pub async fn change_email(&self, user: &User, token: &str) -> Result<bool, AuthTokenError> {
        let (user_id, new_email) = match self.tokens.verify_email_change(token) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!("Rejected email change token for user {}: {}", user.id, e);
                return Ok(false);
            }
        };

        if user_id != user.id {
            return Ok(false);
        }

        if self
            .user_service
            .find_user_by_email(&new_email)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let request = UpdateEmailRequest {
            user_id,
            new_email,
        };

        match self.user_service.update_email(request).await {
            Ok(()) => Ok(true),
            Err(UserServiceError::EmailTaken) | Err(UserServiceError::UserNotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn queue_or_log(
    what: &str,
    queued: Result<JoinHandle<()>, AuthTokenError>,
) -> Option<JoinHandle<()>> {
    match queued {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("Failed to queue {}: {}", what, e);
            None
        }
    }
}
