//! MFWB - Mailing-list form block backend.
//!
//! This library provides the shared modules for the two binaries:
//! - `mfwb-server`: HTTP service for the settings UI, visitor signups and support mail
//! - `mfwb-session`: prints a signed session token for the settings UI
//!
//! ## Architecture
//!
//! ```text
//! Settings UI → /ajax → ActionDispatcher → Services → Registry / MailerDirectory → SettingsStore
//! Visitor form → /subscribe → Services → builder document → campaign → ServiceHandler
//! ```

pub mod ajax;
pub mod config;
pub mod forms;
pub mod html;
pub mod mail;
pub mod mailer;
pub mod registry;
pub mod services;
pub mod store;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use ajax::{ActionDispatcher, ActionHandler, ActionRequest, Caller};
pub use config::Config;
pub use forms::{DocumentStore, Element};
pub use mailer::{MailerDirectory, ServiceHandler};
pub use registry::{Campaign, Registry};
pub use services::Services;
pub use store::{JsonFileStore, MemoryStore, Options, Scope, SettingsStore};
pub use web::AppState;
