use crate::config::{AppConfig, MailSettings};
use crate::services::email_templates::EmailTemplate;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to render email template: {0}")]
    Render(#[from] askama::Error),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A fully rendered message, ready for a transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// Writes outgoing mail to the log instead of delivering it.
pub struct MockEmailService;

impl MockEmailService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!("📧 [MOCK EMAIL] To: {}", email.to);
        tracing::info!("   Subject: {}", email.subject);
        for line in email.text_body.lines() {
            tracing::info!("   {}", line);
        }
        tracing::info!("   ---");
        Ok(())
    }
}

pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    pub fn new(settings: &MailSettings, sender: &str) -> Result<Self, EmailError> {
        let from = sender
            .parse::<Mailbox>()
            .map_err(|e| EmailError::ConfigError(format!("Invalid FLASKY_MAIL_SENDER: {}", e)))?;

        let builder = if settings.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server)
                .map_err(|e| EmailError::ConfigError(format!("SMTP relay error: {}", e)))?
        } else if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
                .map_err(|e| EmailError::ConfigError(format!("SMTP starttls error: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };

        let builder = builder.port(settings.port);
        let mailer = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => builder
                .credentials(Credentials::new(username.clone(), password.clone()))
                .build(),
            _ => builder.build(),
        };

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email
                .to
                .parse()
                .map_err(|e| EmailError::MessageBuild(format!("Invalid to address: {}", e)))?)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text_body,
                email.html_body,
            ))
            .map_err(|e| EmailError::MessageBuild(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

pub fn create_email_service(config: &AppConfig) -> Arc<dyn EmailService> {
    match &config.mail {
        Some(settings) => match SmtpEmailService::new(settings, &config.mail_sender) {
            Ok(service) => {
                tracing::info!("Using SMTP email service via {}", settings.server);
                Arc::new(service)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize SMTP email service: {}. Falling back to mock service",
                    e
                );
                Arc::new(MockEmailService::new())
            }
        },
        None => {
            tracing::info!(
                "MAIL_SERVER not configured. Using mock email service (emails will be logged to console)"
            );
            Arc::new(MockEmailService::new())
        }
    }
}

/// Renders templated mail and delivers it on a background task.
#[derive(Clone)]
pub struct Mailer {
    backend: Arc<dyn EmailService>,
    subject_prefix: String,
}

impl Mailer {
    pub fn new(backend: Arc<dyn EmailService>, subject_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            subject_prefix: subject_prefix.into(),
        }
    }

    /// Renders `template` now and sends it without waiting for delivery.
    ///
    /// Delivery failures are logged; the returned handle completes once the
    /// transport has finished.
    pub fn send_email<T: EmailTemplate>(
        &self,
        to: &str,
        subject: &str,
        template: &T,
    ) -> Result<JoinHandle<()>, EmailError> {
        let email = OutgoingEmail {
            to: to.to_string(),
            subject: format!("{} {}", self.subject_prefix, subject),
            text_body: template.render_text()?,
            html_body: template.render_html()?,
        };

        let backend = Arc::clone(&self.backend);
        Ok(tokio::spawn(async move {
            let to = email.to.clone();
            match backend.send(email).await {
                Ok(()) => tracing::info!("Email sent to {}", to),
                Err(e) => tracing::error!("Failed to send email to {}: {}", to, e),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email_templates::ConfirmAccountEmail;
    use crate::test_utils::test_helpers::RecordingEmailService;

    #[tokio::test]
    async fn test_send_email_prefixes_subject_and_renders_both_bodies() {
        let recorder = Arc::new(RecordingEmailService::default());
        let mailer = Mailer::new(recorder.clone(), "[Flasky]");

        let template = ConfirmAccountEmail {
            username: "john".to_string(),
            confirm_url: "http://localhost/confirm/abc".to_string(),
        };

        mailer
            .send_email("john@example.com", "Confirm Your Account", &template)
            .unwrap()
            .await
            .unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "john@example.com");
        assert_eq!(sent[0].subject, "[Flasky] Confirm Your Account");
        assert!(sent[0].text_body.contains("http://localhost/confirm/abc"));
        assert!(sent[0].html_body.contains("http://localhost/confirm/abc"));
    }

    #[tokio::test]
    async fn test_mock_service_accepts_any_message() {
        let service = MockEmailService::new();
        let result = service
            .send(OutgoingEmail {
                to: "someone@example.com".to_string(),
                subject: "Hello".to_string(),
                text_body: "line 1\nline 2".to_string(),
                html_body: "<p>line 1</p>".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
