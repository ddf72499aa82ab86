//! Session token signing and verification.
//!
//! A session token is `<user>.<timestamp>.<signature>` where the signature is
//! the HMAC-SHA256 hex digest of `<user>.<timestamp>` under the session
//! signing key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Hex HMAC-SHA256 of `<user>.<timestamp>`. `None` only for an unusable key.
pub fn sign_session(signing_key: &str, user: &str, timestamp: u64) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes()).ok()?;
    mac.update(format!("{}.{}", user, timestamp).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Build a complete session token for `user`, stamped now.
pub fn issue_session_token(signing_key: &str, user: &str) -> Option<String> {
    let timestamp = unix_now();
    let signature = sign_session(signing_key, user, timestamp)?;
    Some(format!("{}.{}.{}", user, timestamp, signature))
}

/// Verify a session token and return the user it names.
///
/// Fails on empty input, malformed tokens, timestamps further than
/// `max_age_seconds` from now (in either direction) and signature mismatch.
pub fn verify_session_token(signing_key: &str, token: &str, max_age_seconds: u64) -> Option<String> {
    if signing_key.is_empty() || token.is_empty() {
        warn!(
            has_signing_key = !signing_key.is_empty(),
            has_token = !token.is_empty(),
            "session_token_missing_fields"
        );
        return None;
    }

    // User names may contain dots; the last two segments never do.
    let mut parts = token.rsplitn(3, '.');
    let (Some(signature), Some(timestamp), Some(user)) = (parts.next(), parts.next(), parts.next()) else {
        warn!("session_token_malformed");
        return None;
    };
    if user.is_empty() {
        warn!("session_token_malformed");
        return None;
    }

    let issued: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "session_token_invalid_timestamp");
            return None;
        }
    };

    let current_time = unix_now();
    let age = current_time.abs_diff(issued);

    if age > max_age_seconds {
        warn!(
            user = %user,
            issued = issued,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "session_token_stale"
        );
        return None;
    }

    let Some(expected_signature) = sign_session(signing_key, user, issued) else {
        warn!("session_token_invalid_key");
        return None;
    };

    if !constant_time_compare(&expected_signature, signature) {
        warn!(
            user = %user,
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "session_token_signature_mismatch"
        );
        return None;
    }

    Some(user.to_string())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if session authentication is configured.
pub fn is_session_auth_enabled(signing_key: &Option<String>) -> bool {
    signing_key
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_at(key: &str, user: &str, timestamp: u64) -> String {
        format!("{}.{}.{}", user, timestamp, sign_session(key, user, timestamp).unwrap())
    }

    #[test]
    fn test_verify_missing_fields() {
        assert!(verify_session_token("", "editor.1.abc", 300).is_none());
        assert!(verify_session_token("key", "", 300).is_none());
    }

    #[test]
    fn test_verify_malformed() {
        assert!(verify_session_token("key", "editor", 300).is_none());
        assert!(verify_session_token("key", "editor.123", 300).is_none());
        assert!(verify_session_token("key", ".123.abc", 300).is_none());
        assert!(verify_session_token("key", "editor.not-a-number.abc", 300).is_none());
    }

    #[test]
    fn test_verify_stale() {
        // Very old timestamp (year 2000)
        let token = token_at("key", "editor", 946684800);
        assert!(verify_session_token("key", &token, 300).is_none());
    }

    #[test]
    fn test_verify_valid() {
        let token = issue_session_token("test-signing-key", "editor").unwrap();

        assert_eq!(
            verify_session_token("test-signing-key", &token, 300),
            Some("editor".to_string())
        );
    }

    #[test]
    fn test_verify_user_with_dots() {
        let token = issue_session_token("key", "ada.lovelace").unwrap();

        assert_eq!(verify_session_token("key", &token, 300), Some("ada.lovelace".to_string()));
    }

    #[test]
    fn test_verify_forged() {
        let token = issue_session_token("key", "editor").unwrap();
        let forged = token.replacen("editor", "admin", 1);

        assert!(verify_session_token("key", &forged, 300).is_none());
        assert!(verify_session_token("other-key", &token, 300).is_none());
    }

    #[test]
    fn test_signature_separates_user_and_timestamp() {
        assert_ne!(sign_session("key", "editor1", 23), sign_session("key", "editor", 123));

        // Moving a trailing digit of the user into the timestamp must not
        // keep the signature valid, however lax the age limit.
        let now = unix_now();
        let signature = sign_session("key", "editor1", now).unwrap();
        let shifted = format!("editor.1{}.{}", now, signature);
        assert!(verify_session_token("key", &shifted, u64::MAX).is_none());
        assert_eq!(
            verify_session_token("key", &token_at("key", "editor1", now), u64::MAX),
            Some("editor1".to_string())
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_session_auth_enabled() {
        assert!(!is_session_auth_enabled(&None));
        assert!(!is_session_auth_enabled(&Some("".to_string())));
        assert!(!is_session_auth_enabled(&Some("   ".to_string())));
        assert!(is_session_auth_enabled(&Some("key123".to_string())));
    }
}
