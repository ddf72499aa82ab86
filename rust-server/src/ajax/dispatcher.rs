//! Front-end action dispatcher.
//!
//! One entry point serves every settings-UI request. A request is handled
//! only when:
//! 1. The caller holds a valid session
//! 2. It names an action
//! 3. That action is registered
//!
//! Anything else is dropped without a response body.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::hooks::ActionHook;
use super::types::{ActionArgs, ActionHandler, ActionRequest, Caller, RegisteredAction};

/// Runs the operation bound to an action.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, handler: ActionHandler, args: Vec<Option<Value>>) -> Value;
}

/// Actions registered at startup, with the payload keys each one reads.
pub const DEFAULT_ACTIONS: &[(&str, ActionHandler, &[&str])] = &[
    ("render_service_settings", ActionHandler::RenderServiceSettings, &["service", "add_new"]),
    ("render_service_fields", ActionHandler::RenderServiceFields, &["service", "account"]),
    ("connect_service", ActionHandler::ConnectService, &["service", "fields"]),
    ("delete_service_account", ActionHandler::DeleteServiceAccount, &["service", "account"]),
    ("save_mailer_campaign", ActionHandler::SaveCampaign, &["campaign_name", "campaign_data"]),
    ("delete_mailer_campaign", ActionHandler::DeleteCampaign, &["campaign_name"]),
    ("save_builder_document", ActionHandler::SaveBuilderDocument, &["post_id", "elements"]),
];

/// Action table plus the hooks wrapped around each call.
#[derive(Default)]
pub struct ActionDispatcher {
    actions: RwLock<HashMap<String, RegisteredAction>>,
    hooks: Vec<Arc<dyn ActionHook>>,
}

impl ActionDispatcher {
    /// Dispatcher with an empty action table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with [`DEFAULT_ACTIONS`] registered.
    pub fn with_default_actions() -> Self {
        let dispatcher = Self::new();
        for (name, handler, args) in DEFAULT_ACTIONS {
            dispatcher.register(name, *handler, args);
        }
        dispatcher
    }

    pub fn add_hook(&mut self, hook: Arc<dyn ActionHook>) {
        self.hooks.push(hook);
    }

    /// Register an action, replacing any action of the same name.
    pub fn register(&self, name: &str, handler: ActionHandler, args: &[&str]) {
        let action = RegisteredAction {
            name: name.to_string(),
            handler,
            args: args.iter().map(|a| a.to_string()).collect(),
        };

        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        if actions.insert(name.to_string(), action).is_some() {
            debug!(action = %name, "ajax_action_replaced");
        }
    }

    /// Remove an action. Unknown names are ignored.
    pub fn unregister(&self, name: &str) {
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        if actions.remove(name).is_some() {
            info!(action = %name, "ajax_action_unregistered");
        }
    }

    pub fn action(&self, name: &str) -> Option<RegisteredAction> {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        actions.get(name).cloned()
    }

    /// Run one request. Returns the response body, or `None` when the
    /// request is dropped.
    pub async fn dispatch(
        &self,
        caller: &Caller,
        request: ActionRequest,
        executor: &dyn ActionExecutor,
    ) -> Option<Value> {
        if !caller.is_authenticated() {
            warn!("ajax_unauthenticated_dropped");
            return None;
        }

        let name = request.action?;

        for hook in &self.hooks {
            hook.before_any(&name);
        }

        let Some(action) = self.action(&name) else {
            debug!(action = %name, "ajax_unknown_action_dropped");
            return None;
        };

        let keyed: ActionArgs = action
            .args
            .iter()
            .map(|key| (key.clone(), request.payload.get(key).cloned()))
            .collect();
        let positional: Vec<Option<Value>> = keyed.iter().map(|(_, v)| v.clone()).collect();

        for hook in &self.hooks {
            hook.before(&action.name, &keyed);
        }

        let mut result = executor.execute(action.handler, positional).await;
        for hook in &self.hooks {
            result = hook.filter(&action.name, result, &keyed);
        }

        for hook in &self.hooks {
            hook.after(&action.name, &keyed);
        }
        for hook in &self.hooks {
            hook.after_any(&action.name);
        }

        Some(result)
    }
}
