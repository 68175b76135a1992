//! Outbound notifications for the password recovery flow.
//!
//! Delivery is abstracted behind the [`Notifier`] trait so the recovery
//! service never knows whether codes go out over SMTP, to the log (local
//! development), or into a test recorder.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use sunleaf_core::Email;

use crate::config::{ApiConfig, SmtpConfig};

/// HTML template for the recovery code email.
#[derive(Template)]
#[template(path = "email/one_time_code.html")]
struct OneTimeCodeEmailHtml<'a> {
    name: &'a str,
    code: &'a str,
}

/// Plain text template for the recovery code email.
#[derive(Template)]
#[template(path = "email/one_time_code.txt")]
struct OneTimeCodeEmailText<'a> {
    name: &'a str,
    code: &'a str,
}

/// HTML template for the reset confirmation email.
#[derive(Template)]
#[template(path = "email/reset_confirmation.html")]
struct ResetConfirmationEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for the reset confirmation email.
#[derive(Template)]
#[template(path = "email/reset_confirmation.txt")]
struct ResetConfirmationEmailText<'a> {
    name: &'a str,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Delivery channel for recovery notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a one-time recovery code to the account's email.
    async fn send_one_time_code(
        &self,
        to: &Email,
        name: &str,
        code: &str,
    ) -> Result<(), NotifyError>;

    /// Confirm that the account's password was just reset.
    async fn send_reset_confirmation(&self, to: &Email, name: &str) -> Result<(), NotifyError>;
}

/// Build the notifier selected by configuration.
///
/// SMTP when the full SMTP block is configured, otherwise a console notifier
/// that logs codes for local development.
///
/// # Errors
///
/// Returns `NotifyError::Smtp` if the SMTP relay cannot be constructed.
pub fn notifier_from_config(config: &ApiConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpNotifier::new(smtp)?)),
        None => {
            tracing::warn!(
                "SMTP not configured; recovery codes will be logged instead of emailed"
            );
            Ok(Arc::new(ConsoleNotifier))
        }
    }
}

// =============================================================================
// SMTP
// =============================================================================

/// Sends notifications over SMTP with both plain text and HTML bodies.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be constructed.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_one_time_code(
        &self,
        to: &Email,
        name: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        let html = OneTimeCodeEmailHtml { name, code }.render()?;
        let text = OneTimeCodeEmailText { name, code }.render()?;

        self.send_multipart_email(to.as_str(), "Your Sunleaf Password Reset Code", &text, &html)
            .await
    }

    async fn send_reset_confirmation(&self, to: &Email, name: &str) -> Result<(), NotifyError> {
        let html = ResetConfirmationEmailHtml { name }.render()?;
        let text = ResetConfirmationEmailText { name }.render()?;

        self.send_multipart_email(to.as_str(), "Your Sunleaf Password Was Changed", &text, &html)
            .await
    }
}

// =============================================================================
// Console (local development)
// =============================================================================

/// Logs notifications instead of delivering them.
///
/// Codes are logged at WARN so they stand out, and so a default INFO filter
/// in production would still make an accidental deployment of this notifier
/// visible.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_one_time_code(
        &self,
        to: &Email,
        name: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        tracing::warn!(
            to = %to.masked(),
            name = %name,
            code = %code,
            "SMTP not configured; logging recovery code instead of emailing it"
        );
        Ok(())
    }

    async fn send_reset_confirmation(&self, to: &Email, name: &str) -> Result<(), NotifyError> {
        tracing::warn!(
            to = %to.masked(),
            name = %name,
            "SMTP not configured; skipping reset confirmation email"
        );
        Ok(())
    }
}

/// Generate a 6-digit recovery code.
#[must_use]
pub fn generate_one_time_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

// =============================================================================
// Test support
// =============================================================================

/// Records sent notifications for assertions instead of delivering them.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub codes: std::sync::Mutex<Vec<(String, String)>>,
    pub confirmations: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
#[async_trait]
#[allow(clippy::unwrap_used)]
impl Notifier for RecordingNotifier {
    async fn send_one_time_code(
        &self,
        to: &Email,
        _name: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        self.codes
            .lock()
            .unwrap()
            .push((to.as_str().to_string(), code.to_string()));
        Ok(())
    }

    async fn send_reset_confirmation(&self, to: &Email, _name: &str) -> Result<(), NotifyError> {
        self.confirmations
            .lock()
            .unwrap()
            .push(to.as_str().to_string());
        Ok(())
    }
}
