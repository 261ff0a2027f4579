pub mod auth_service;
pub mod auth_token_service;
pub mod email_service;
pub mod email_templates;
pub mod signed_token;
pub mod user_service;

pub use auth_service::{AuthService, AuthServiceError, LoginRequest};
pub use auth_token_service::{AuthTokenError, AuthTokenService};
pub use email_service::{
    create_email_service, EmailError, EmailService, Mailer, MockEmailService, OutgoingEmail,
    SmtpEmailService,
};
pub use email_templates::EmailTemplate;
pub use signed_token::{TokenError, TokenPurpose, TokenSigner};
pub use user_service::{UserService, UserServiceError};
