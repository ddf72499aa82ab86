//! Request, caller and action table types for the front-end dispatcher.

use serde_json::{Map, Value};

/// Who sent a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// Holder of a valid session for the named user
    User(String),
}

impl Caller {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Caller::User(_))
    }
}

/// One inbound dispatcher request.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Requested action name
    pub action: Option<String>,
    /// Action-specific parameters
    pub payload: Map<String, Value>,
}

impl ActionRequest {
    /// Build a request from a decoded payload.
    ///
    /// The action name is read from the payload's `action` field, falling
    /// back to `query_action`. Empty names count as absent.
    pub fn from_payload(payload: Map<String, Value>, query_action: Option<String>) -> Self {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(query_action)
            .filter(|a| !a.trim().is_empty());

        Self { action, payload }
    }
}

/// Built-in operations an action can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHandler {
    RenderServiceSettings,
    RenderServiceFields,
    ConnectService,
    DeleteServiceAccount,
    SaveCampaign,
    DeleteCampaign,
    SaveBuilderDocument,
}

/// An entry of the action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredAction {
    pub name: String,
    pub handler: ActionHandler,
    /// Payload keys read, in order, into the handler's positional arguments
    pub args: Vec<String>,
}

/// Arguments as (key, value) pairs; `None` marks a key missing from the payload.
pub type ActionArgs = Vec<(String, Option<Value>)>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_action_from_payload_wins_over_query() {
        let request = ActionRequest::from_payload(
            payload(json!({"action": "connect_service"})),
            Some("delete_mailer_campaign".to_string()),
        );
        assert_eq!(request.action.as_deref(), Some("connect_service"));
    }

    #[test]
    fn test_action_falls_back_to_query() {
        let request = ActionRequest::from_payload(payload(json!({})), Some("connect_service".to_string()));
        assert_eq!(request.action.as_deref(), Some("connect_service"));
    }

    #[test]
    fn test_empty_action_is_absent() {
        let request = ActionRequest::from_payload(payload(json!({"action": " "})), None);
        assert!(request.action.is_none());

        let request = ActionRequest::from_payload(payload(json!({"action": 5})), None);
        assert!(request.action.is_none());
    }

    #[test]
    fn test_caller_authentication() {
        assert!(!Caller::Anonymous.is_authenticated());
        assert!(Caller::User("editor".to_string()).is_authenticated());
    }
}
