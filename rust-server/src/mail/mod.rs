//! Outbound mail transport for the support form.

pub mod mailgun;

use async_trait::async_trait;
use tracing::warn;

pub use mailgun::MailgunTransport;

/// Sends one HTML email. Returns whether the message was accepted.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str, headers: &[(String, String)]) -> bool;
}

/// Transport used when no mail provider is configured. Rejects everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTransport;

#[async_trait]
impl MailTransport for DisabledTransport {
    async fn send(&self, to: &str, subject: &str, _html_body: &str, _headers: &[(String, String)]) -> bool {
        warn!(to = %to, subject = %subject, "mail_transport_not_configured");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_transport_rejects() {
        assert!(!DisabledTransport.send("a@b.c", "s", "<p>x</p>", &[]).await);
    }
}
