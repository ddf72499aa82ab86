//! Front-end AJAX dispatch.
//!
//! ## Flow
//!
//! ```text
//! POST /ajax → Caller + ActionRequest → ActionDispatcher → ActionExecutor → JSON
//! ```

pub mod dispatcher;
pub mod hooks;
pub mod types;

pub use dispatcher::{ActionDispatcher, ActionExecutor, DEFAULT_ACTIONS};
pub use hooks::{ActionHook, TracingHook};
pub use types::{ActionArgs, ActionHandler, ActionRequest, Caller, RegisteredAction};
