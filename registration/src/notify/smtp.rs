//! SMTP welcome notifier using lettre's async transport.

use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::Notifier;
use crate::config::SmtpConfig;
use crate::user::UserPayload;

/// Why a welcome email was not delivered. Logged, never propagated.
#[derive(Debug, Error)]
pub enum NotificationFailure {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Send(#[from] lettre::transport::smtp::Error),
}

struct Transport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

/// Welcome notifier over an authenticated STARTTLS relay.
///
/// Built disabled when no credentials are configured; a disabled notifier
/// logs every skipped recipient.
pub struct SmtpNotifier {
    transport: Option<Transport>,
}

impl SmtpNotifier {
    pub fn disabled() -> Self {
        Self { transport: None }
    }

    /// Build the transport from configuration and verify it once.
    ///
    /// Never fails: missing credentials disable the notifier, and a failed
    /// verification is logged while the transport is kept for later sends.
    pub async fn launch(config: &SmtpConfig) -> Self {
        let Some((username, password)) = config.credentials() else {
            warn!("email_credentials_missing_notifier_disabled");
            return Self::disabled();
        };

        let sender = match username.parse::<Address>() {
            Ok(address) => Mailbox::new(Some(config.sender_name.clone()), address),
            Err(e) => {
                error!(error = %e, "email_sender_address_invalid");
                return Self::disabled();
            }
        };

        let mailer = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host) {
            Ok(builder) => builder
                .port(config.port)
                .credentials(Credentials::new(username.to_string(), password.to_string()))
                .build(),
            Err(e) => {
                error!(host = %config.host, error = %e, "email_transport_build_failed");
                return Self::disabled();
            }
        };

        match mailer.test_connection().await {
            Ok(true) => info!(host = %config.host, port = config.port, "email_transport_verified"),
            Ok(false) => error!(host = %config.host, "email_transport_verify_failed"),
            Err(e) => error!(host = %config.host, error = %e, "email_transport_verify_failed"),
        }

        Self {
            transport: Some(Transport { mailer, sender }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_welcome(&self, user: &UserPayload) {
        let Some(transport) = self.transport.as_ref() else {
            error!(recipient = %user.email, "email_notifier_not_initialized");
            return;
        };

        match deliver(transport, user).await {
            Ok(()) => info!(recipient = %user.email, "welcome_email_sent"),
            Err(e) => error!(recipient = %user.email, error = %e, "welcome_email_failed"),
        }
    }
}

async fn deliver(transport: &Transport, user: &UserPayload) -> Result<(), NotificationFailure> {
    let message = welcome_message(&transport.sender, user)?;
    transport.mailer.send(message).await?;
    Ok(())
}

/// Build the plain-text + HTML welcome email.
pub fn welcome_message(sender: &Mailbox, user: &UserPayload) -> Result<Message, NotificationFailure> {
    let recipient = Mailbox::new(Some(user.name.clone()), user.email.parse::<Address>()?);

    let text = format!(
        "Hello {},\n\nYour registration was completed successfully!\n\nBest regards,\nThe Team.",
        user.name
    );
    let html = format!(
        "<p>Hello <b>{}</b>,</p>\
         <p>Your registration was completed successfully!</p>\
         <p>Thank you for joining us.</p>\
         <p>Best regards,<br>The Team.</p>",
        escape_html(&user.name)
    );

    let message = Message::builder()
        .from(sender.clone())
        .to(recipient)
        .subject(format!("Welcome, {}!", user.name))
        .multipart(MultiPart::alternative_plain_html(text, html))?;

    Ok(message)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserPayload {
        UserPayload {
            name: "Teste Jest".to_string(),
            email: "teste.jest@example.com".to_string(),
            phone: "987654321".to_string(),
        }
    }

    fn sender() -> Mailbox {
        Mailbox::new(
            Some("Registration Team".to_string()),
            "noreply@example.com".parse().unwrap(),
        )
    }

    #[test]
    fn test_welcome_message_headers() {
        let message = welcome_message(&sender(), &user()).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(raw.contains("Subject: Welcome, Teste Jest!"));
        assert!(raw.contains("teste.jest@example.com"));
        assert!(raw.contains("noreply@example.com"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("987654321"));
    }

    #[test]
    fn test_welcome_message_rejects_bad_recipient() {
        let mut bad = user();
        bad.email = "not-an-address".to_string();

        let err = welcome_message(&sender(), &bad).unwrap_err();
        assert!(matches!(err, NotificationFailure::Address(_)));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>Ana & Bob</b>"), "&lt;b&gt;Ana &amp; Bob&lt;/b&gt;");
        assert_eq!(escape_html("Maria"), "Maria");
    }

    #[tokio::test]
    async fn test_launch_without_credentials_is_disabled() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
            sender_name: "Team".to_string(),
        };

        let notifier = SmtpNotifier::launch(&config).await;
        assert!(!notifier.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_notifier_swallows_send() {
        let notifier = SmtpNotifier::disabled();
        // Completes without raising even though nothing can be delivered
        notifier.send_welcome(&user()).await;
    }
}
