//! Mailgun HTTP API transport.
//!
//! Messages are posted form-encoded to `<api_base>/<domain>/messages` with
//! basic auth `api:<key>`. Custom headers travel as `h:<Name>` fields.
//! Reference: https://documentation.mailgun.com/docs/mailgun/api-reference/openapi-final/tag/Messages/

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use super::MailTransport;

/// Headers Mailgun derives itself from the message parts.
const MANAGED_HEADERS: &[&str] = &["mime-version", "content-type", "from", "to", "subject"];

/// Mailgun messages API client.
#[derive(Clone)]
pub struct MailgunTransport {
    client: Client,
    api_base: String,
    domain: String,
    api_key: String,
}

impl MailgunTransport {
    pub fn new(client: Client, api_base: String, domain: String, api_key: String) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            domain,
            api_key,
        }
    }

    fn sender(&self) -> String {
        format!("MFWB Support <postmaster@{}>", self.domain)
    }

    fn form_fields(&self, to: &str, subject: &str, html_body: &str, headers: &[(String, String)]) -> Vec<(String, String)> {
        let mut form = vec![
            ("from".to_string(), self.sender()),
            ("to".to_string(), to.to_string()),
            ("subject".to_string(), subject.to_string()),
            ("html".to_string(), html_body.to_string()),
        ];

        for (name, value) in headers {
            if MANAGED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                continue;
            }
            form.push((format!("h:{}", name), value.clone()));
        }

        form
    }
}

#[async_trait]
impl MailTransport for MailgunTransport {
    async fn send(&self, to: &str, subject: &str, html_body: &str, headers: &[(String, String)]) -> bool {
        let url = format!("{}/{}/messages", self.api_base, self.domain);
        let form = self.form_fields(to, subject, html_body, headers);

        info!(
            to = %to,
            subject = %subject,
            html_length = html_body.len(),
            "mailgun_send_start"
        );

        match self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(to = %to, status_code = resp.status().as_u16(), "mailgun_send_complete");
                true
            }
            Ok(resp) => {
                warn!(to = %to, status_code = resp.status().as_u16(), "mailgun_send_rejected");
                false
            }
            Err(e) => {
                error!(to = %to, error = %e, "mailgun_send_error");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::post, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_stub(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn transport(base: String) -> MailgunTransport {
        MailgunTransport::new(Client::new(), base, "mg.example.com".to_string(), "key".to_string())
    }

    #[test]
    fn test_form_fields_skip_managed_headers() {
        let t = transport("http://localhost".to_string());
        let headers = vec![
            ("MIME-Version".to_string(), "1.0".to_string()),
            ("Content-Type".to_string(), "text/html".to_string()),
            ("Reply-To".to_string(), "Jane <jane@example.com>".to_string()),
        ];

        let form = t.form_fields("support@example.com", "Hi", "<p>x</p>", &headers);

        assert!(form.contains(&("from".to_string(), "MFWB Support <postmaster@mg.example.com>".to_string())));
        assert!(form.contains(&("h:Reply-To".to_string(), "Jane <jane@example.com>".to_string())));
        assert!(!form.iter().any(|(k, _)| k == "h:MIME-Version" || k == "h:Content-Type"));
    }

    #[tokio::test]
    async fn test_send_accepted() {
        let app = Router::new().route(
            "/mg.example.com/messages",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                if form.get("to").map(String::as_str) == Some("support@example.com")
                    && form.contains_key("html")
                {
                    StatusCode::OK
                } else {
                    StatusCode::BAD_REQUEST
                }
            }),
        );
        let base = spawn_stub(app).await;

        assert!(transport(base).send("support@example.com", "Hi", "<p>x</p>", &[]).await);
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let app = Router::new().route(
            "/mg.example.com/messages",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = spawn_stub(app).await;

        assert!(!transport(base).send("support@example.com", "Hi", "<p>x</p>", &[]).await);
    }
}
