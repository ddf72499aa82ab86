//! Extension points around every dispatched action.

use serde_json::Value;
use tracing::{debug, info};

use super::types::ActionArgs;

/// Observer of the dispatch lifecycle. Every method defaults to a no-op.
///
/// Call order for one request:
///
/// ```text
/// before_any → before → (handler) → filter → after → after_any
/// ```
///
/// `before_any` also fires for unknown action names; the rest only fire for
/// registered actions.
pub trait ActionHook: Send + Sync {
    fn before_any(&self, _action: &str) {}

    fn before(&self, _action: &str, _args: &ActionArgs) {}

    /// Rewrite a handler result before it is returned.
    fn filter(&self, _action: &str, result: Value, _args: &ActionArgs) -> Value {
        result
    }

    fn after(&self, _action: &str, _args: &ActionArgs) {}

    fn after_any(&self, _action: &str) {}
}

/// Logs each lifecycle step.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl ActionHook for TracingHook {
    fn before_any(&self, action: &str) {
        debug!(action = %action, "ajax_action_received");
    }

    fn before(&self, action: &str, args: &ActionArgs) {
        let missing: Vec<&str> = args
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.as_str())
            .collect();
        info!(
            action = %action,
            arg_count = args.len(),
            missing_args = ?missing,
            "ajax_action_start"
        );
    }

    fn after(&self, action: &str, _args: &ActionArgs) {
        info!(action = %action, "ajax_action_complete");
    }
}
