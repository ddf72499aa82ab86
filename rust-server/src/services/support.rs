//! Support contact form delivered by email.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Services;
use crate::util::{escape_html, sanitize_email, sanitize_text_field, sanitize_url};

/// Contact form posted from the settings UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SupportRequest {
    pub email: String,
    pub site_url: String,
    pub name: String,
    /// Topic id such as `question` or `bug`
    pub subject: String,
    pub message: String,
    pub post_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportData {
    pub msg: String,
}

/// `{ "success": bool, "data": { "msg": "..." } }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportResponse {
    pub success: bool,
    pub data: SupportData,
}

impl SupportResponse {
    pub fn sent() -> Self {
        Self {
            success: true,
            data: SupportData {
                msg: "Thank you!".to_string(),
            },
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            data: SupportData {
                msg: "Something went wrong!".to_string(),
            },
        }
    }
}

/// Email subject for a support topic.
pub fn support_subject(topic: &str, name: &str) -> String {
    let prefix = match topic {
        "question" => "New question received from",
        "bug" => "New bug found by",
        "help" => "New help request received from",
        "professional" => "New service quote request received from",
        "contribute" => "New development contribution request by",
        "other" => "New contact request received from",
        _ => "Unknown",
    };
    format!("[MFWB] {} {}", prefix, name)
}

/// Sanitized fields of a support request.
struct SupportMessage {
    email: Option<String>,
    site: Option<String>,
    name: String,
    topic: String,
    message: String,
    post_url: Option<String>,
}

impl SupportMessage {
    fn from_request(request: &SupportRequest) -> Self {
        Self {
            email: sanitize_email(&request.email),
            site: sanitize_url(&request.site_url),
            name: sanitize_text_field(&request.name),
            topic: sanitize_text_field(&request.subject),
            message: escape_html(request.message.trim()),
            post_url: sanitize_url(&request.post_url),
        }
    }

    fn html_body(&self) -> String {
        let row = |label: &str, value: &str| {
            format!(
                r#"<tr><td width="22%">{} :</td><td width="78%"><strong>{}</strong></td></tr>"#,
                label,
                escape_html(value)
            )
        };

        let mut rows = vec![
            row("Name", &self.name),
            row("Email", self.email.as_deref().unwrap_or_default()),
            row("Website", self.site.as_deref().unwrap_or_default()),
        ];
        if let Some(post_url) = &self.post_url {
            rows.push(row("Page", post_url));
        }

        format!(
            concat!(
                "<html><head><title>MFWB Plugin</title></head><body>",
                r#"<table width="100%" cellpadding="10" cellspacing="10">"#,
                r#"<tr><th colspan="2">MFWB Plugin Support</th></tr>"#,
                "{}",
                r#"<tr><td colspan="2">Message :</td></tr>"#,
                r#"<tr><td colspan="2">{}</td></tr>"#,
                "</table></body></html>"
            ),
            rows.concat(),
            self.message
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("MIME-Version".to_string(), "1.0".to_string()),
            ("Content-Type".to_string(), "text/html; charset=utf-8".to_string()),
        ];
        if let Some(email) = &self.email {
            let reply_to = if self.name.is_empty() {
                email.clone()
            } else {
                format!("{} <{}>", self.name, email)
            };
            headers.push(("Reply-To".to_string(), reply_to));
        }
        headers
    }
}

impl Services {
    /// Email a support request to the configured support address.
    pub async fn submit_support(&self, request: SupportRequest) -> SupportResponse {
        let Some(to) = self.support_to.as_deref() else {
            warn!("support_recipient_not_configured");
            return SupportResponse::failed();
        };

        let message = SupportMessage::from_request(&request);
        let subject = support_subject(&message.topic, &message.name);

        info!(topic = %message.topic, has_reply_to = message.email.is_some(), "support_submit_start");

        if self
            .transport
            .send(to, &subject, &message.html_body(), &message.headers())
            .await
        {
            info!(topic = %message.topic, "support_submit_complete");
            SupportResponse::sent()
        } else {
            warn!(topic = %message.topic, "support_submit_failed");
            SupportResponse::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{services_with, FakeHandler, RecordingTransport};
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> SupportRequest {
        serde_json::from_value(json!({
            "email": "Ada <ada@example.com>",
            "site_url": "https://example.com",
            "name": "<b>Ada</b> Lovelace",
            "subject": "bug",
            "message": "Form shows <script>alert(1)</script>",
            "post_url": "javascript:alert(1)"
        }))
        .unwrap()
    }

    #[test]
    fn test_support_subjects() {
        assert_eq!(support_subject("question", "Ada"), "[MFWB] New question received from Ada");
        assert_eq!(support_subject("bug", "Ada"), "[MFWB] New bug found by Ada");
        assert_eq!(support_subject("help", "Ada"), "[MFWB] New help request received from Ada");
        assert_eq!(
            support_subject("professional", "Ada"),
            "[MFWB] New service quote request received from Ada"
        );
        assert_eq!(
            support_subject("contribute", "Ada"),
            "[MFWB] New development contribution request by Ada"
        );
        assert_eq!(support_subject("other", "Ada"), "[MFWB] New contact request received from Ada");
        assert_eq!(support_subject("spam", "Ada"), "[MFWB] Unknown Ada");
    }

    #[tokio::test]
    async fn test_submit_sends_sanitized_mail() {
        let transport = Arc::new(RecordingTransport::default());
        let services = services_with(Arc::new(FakeHandler::default()), transport.clone());

        let response = services.submit_support(request()).await;

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "data": {"msg": "Thank you!"}})
        );

        let sent = transport.sent.lock().unwrap();
        let (to, subject, html, headers) = &sent[0];
        assert_eq!(to, "support@example.com");
        assert_eq!(subject, "[MFWB] New bug found by Ada Lovelace");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<strong>ada@example.com</strong>"));
        assert!(!html.contains("javascript:"));
        assert!(headers.contains(&("Reply-To".to_string(), "Ada Lovelace <ada@example.com>".to_string())));
    }

    #[tokio::test]
    async fn test_invalid_email_skips_reply_to() {
        let transport = Arc::new(RecordingTransport::default());
        let services = services_with(Arc::new(FakeHandler::default()), transport.clone());
        let mut request = request();
        request.email = "not an address".to_string();

        assert!(services.submit_support(request).await.success);

        let sent = transport.sent.lock().unwrap();
        assert!(sent[0].3.iter().all(|(name, _)| name != "Reply-To"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let transport = Arc::new(RecordingTransport {
            reject: true,
            ..Default::default()
        });
        let services = services_with(Arc::new(FakeHandler::default()), transport);

        let response = services.submit_support(request()).await;

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "data": {"msg": "Something went wrong!"}})
        );
    }
}
