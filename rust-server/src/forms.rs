//! Page-builder documents and form lookup.
//!
//! A builder document is the element tree of one page. Forms are elements
//! somewhere in that tree; a form may delegate its fields to a saved
//! template document through `templateID`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::store::{Options, StoreError};

/// Prefix of the option key holding a builder document.
pub const DOCUMENT_OPTION_PREFIX: &str = "builder_document:";

/// One node of a builder element tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(
        default,
        rename = "templateID",
        skip_serializing_if = "Option::is_none"
    )]
    pub template_id: Option<String>,
}

impl Element {
    /// Template document this element delegates to, if any.
    pub fn template(&self) -> Option<&str> {
        self.template_id.as_deref().filter(|t| !t.is_empty())
    }

    /// The form field list, `None` when absent or empty.
    pub fn form_fields(&self) -> Option<&Vec<Value>> {
        self.settings
            .get("form_fields")
            .and_then(Value::as_array)
            .filter(|f| !f.is_empty())
    }
}

/// Post id given as a string or a number; empty strings are rejected.
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Depth-first search for the element with `id`. The first match wins.
pub fn find_element<'a>(elements: &'a [Element], id: &str) -> Option<&'a Element> {
    for element in elements {
        if element.id == id {
            return Some(element);
        }
        if let Some(found) = find_element(&element.elements, id) {
            return Some(found);
        }
    }
    None
}

/// Builder documents stored as options.
#[derive(Clone)]
pub struct DocumentStore {
    options: Options,
}

impl DocumentStore {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    fn key(post_id: &str) -> String {
        format!("{}{}", DOCUMENT_OPTION_PREFIX, post_id)
    }

    pub fn load(&self, post_id: &str) -> Result<Option<Vec<Element>>, StoreError> {
        self.options.get(&Self::key(post_id))
    }

    pub fn save(&self, post_id: &str, elements: &[Element]) -> Result<(), StoreError> {
        self.options.put(&Self::key(post_id), &elements)?;
        info!(post_id = %post_id, elements = elements.len(), "builder_document_saved");
        Ok(())
    }
}
