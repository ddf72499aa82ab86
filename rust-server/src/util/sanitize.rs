//! Input sanitizing and output escaping helpers.
//!
//! Everything that arrives from the settings UI or from a visitor form passes
//! through one of these before it is stored or echoed back as markup.

use tracing::debug;
use url::Url;

/// Clean a single-line text value.
///
/// Strips markup tags, turns line breaks and tabs into spaces, collapses runs
/// of whitespace and trims the result.
pub fn sanitize_text_field(raw: &str) -> String {
    let mut stripped = String::with_capacity(raw.len());
    let mut in_tag = false;

    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            '\r' | '\n' | '\t' => stripped.push(' '),
            _ => stripped.push(c),
        }
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape a value for use in HTML text or a quoted attribute.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse an email address, accepting `Name <addr>` forms.
///
/// Returns the bare address, or `None` when no single address with a local
/// part and a domain can be extracted.
pub fn sanitize_email(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = match mailparse::addrparse(raw) {
        Ok(list) => list,
        Err(e) => {
            debug!(error = %e, "email_address_parse_failed");
            return None;
        }
    };

    let info = parsed.extract_single_info()?;
    let addr = info.addr.trim();
    let (local, domain) = addr.split_once('@')?;

    if local.is_empty() || domain.is_empty() || addr.chars().any(char::is_whitespace) {
        return None;
    }

    Some(addr.to_string())
}

/// Accept only absolute http(s) URLs, normalized by the URL parser.
pub fn sanitize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_field_strips_tags_and_whitespace() {
        assert_eq!(sanitize_text_field("  <b>Main</b>\n list\t "), "Main list");
        assert_eq!(sanitize_text_field("plain"), "plain");
        assert_eq!(sanitize_text_field("<script>x</script>"), "x");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_sanitize_email() {
        assert_eq!(
            sanitize_email("jane@example.com"),
            Some("jane@example.com".to_string())
        );
        assert_eq!(
            sanitize_email("Jane Doe <jane@example.com>"),
            Some("jane@example.com".to_string())
        );
        assert_eq!(sanitize_email("not-an-email"), None);
        assert_eq!(sanitize_email(""), None);
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url("https://example.com/page"),
            Some("https://example.com/page".to_string())
        );
        assert_eq!(sanitize_url("javascript:alert(1)"), None);
        assert_eq!(sanitize_url("/relative"), None);
    }
}
