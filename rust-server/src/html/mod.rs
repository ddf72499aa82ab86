//! HTML fragments for the mailer settings UI.

pub mod field;
pub mod types;

pub use field::render_settings_field;
pub use types::{FieldConfig, FieldType};
