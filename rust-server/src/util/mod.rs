//! Shared helpers.

pub mod sanitize;

pub use sanitize::{escape_html, sanitize_email, sanitize_text_field, sanitize_url};
