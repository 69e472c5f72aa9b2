//! Email sending
//!
//! Mail is never on the critical path: callers dispatch through
//! [`fire_and_forget`], which runs the send on a blocking worker and logs
//! failures instead of propagating them.

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// SMTP sender for production
pub struct SmtpMailer {
    transport: SmtpTransport,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let transport = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| e.to_string())?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();
        Ok(Self { transport, from_address: config.from_address.clone() })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(self.from_address.parse().map_err(|_| "invalid from address".to_string())?)
            .to(to.parse().map_err(|_| format!("invalid recipient: {to}"))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| e.to_string())?;
        self.transport.send(&message).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Development sender that logs instead of delivering
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        tracing::info!(to, subject, "email (console): {}", body);
        Ok(())
    }
}

/// Detach an email send from the request path. Failures are logged, never
/// surfaced to the caller.
pub fn fire_and_forget(mailer: Arc<dyn Mailer>, to: String, subject: String, body: String) {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = mailer.send(&to, &subject, &body) {
            tracing::error!(to, subject, "failed to send email: {}", err);
        }
    });
}

pub fn verification_email(frontend_url: &str, token: &str) -> (String, String) {
    (
        "Verify your NatureVita account".to_string(),
        format!(
            "Welcome to NatureVita!\n\nPlease confirm your email address:\n{frontend_url}/verify-email?token={token}\n\nThe link expires in 24 hours."
        ),
    )
}

pub fn password_reset_email(frontend_url: &str, token: &str) -> (String, String) {
    (
        "Reset your NatureVita password".to_string(),
        format!(
            "A password reset was requested for your account.\n\nReset it here:\n{frontend_url}/reset-password?token={token}\n\nThe link expires in 1 hour. If you did not request this, ignore this email."
        ),
    )
}

pub fn order_confirmation_email(order_number: &str, total: &str) -> (String, String) {
    (
        format!("Order {order_number} confirmed"),
        format!(
            "Thank you for your order!\n\nOrder number: {order_number}\nTotal: {total} FCFA\n\nWe will notify you when it ships."
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_mailer_never_fails() {
        assert!(ConsoleMailer.send("user@example.com", "hi", "body").is_ok());
    }

    #[test]
    fn test_email_bodies_carry_token() {
        let (_, body) = verification_email("https://shop.test", "abc123");
        assert!(body.contains("verify-email?token=abc123"));
        let (_, body) = password_reset_email("https://shop.test", "tok");
        assert!(body.contains("reset-password?token=tok"));
        let (subject, body) = order_confirmation_email("NV-00010001", "1800");
        assert!(subject.contains("NV-00010001"));
        assert!(body.contains("1800"));
    }
}
