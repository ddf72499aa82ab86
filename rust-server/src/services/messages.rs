//! Visitor-facing message catalog.
//!
//! A form may override any message through a `<kind>_message` setting.

use serde_json::{Map, Value};

/// Outcome kinds with a visitor-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    FieldRequired,
    InvalidForm,
    ServerError,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Success => "success",
            MessageKind::Error => "error",
            MessageKind::FieldRequired => "field_required",
            MessageKind::InvalidForm => "invalid_form",
            MessageKind::ServerError => "server_error",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "success" => Some(MessageKind::Success),
            "error" => Some(MessageKind::Error),
            "field_required" => Some(MessageKind::FieldRequired),
            "invalid_form" => Some(MessageKind::InvalidForm),
            "server_error" => Some(MessageKind::ServerError),
            _ => None,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            MessageKind::Success => "The message was sent successfully!",
            MessageKind::Error => "Something went wrong... Please fill in the required fields.",
            MessageKind::FieldRequired => "Required",
            MessageKind::InvalidForm => "Something went wrong... Please set mailer.",
            MessageKind::ServerError => "Server error. Form not sent.",
        }
    }
}

/// Message for `kind`, preferring the form's override.
pub fn message_for(kind: MessageKind, settings: Option<&Map<String, Value>>) -> String {
    let key = format!("{}_message", kind.as_str());
    settings
        .and_then(|s| s.get(&key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_message().to_string())
}

/// Message for a kind given by id; unknown ids read `Unknown`.
pub fn message_for_id(id: &str, settings: Option<&Map<String, Value>>) -> String {
    match MessageKind::parse(id) {
        Some(kind) => message_for(kind, settings),
        None => "Unknown".to_string(),
    }
}
