//! Type definitions for settings field rendering.

/// Kind of settings field to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Select,
    Button,
    Checkbox,
    /// Anything unrecognized. Renders an empty field body.
    #[default]
    Other,
}

impl From<&str> for FieldType {
    fn from(raw: &str) -> Self {
        match raw {
            "text" => FieldType::Text,
            "select" => FieldType::Select,
            "button" => FieldType::Button,
            "checkbox" => FieldType::Checkbox,
            _ => FieldType::Other,
        }
    }
}

/// Options controlling how one settings field renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldConfig {
    pub field_type: FieldType,
    pub label: String,
    /// Class of the input element itself
    pub class: String,
    /// Extra class on the wrapping row
    pub row_class: String,
    /// Select options as ordered (value, label) pairs
    pub options: Vec<(String, String)>,
    /// Selected option value for selects
    pub default: Option<String>,
    pub multi_select: bool,
    /// Help text shown under text inputs
    pub help: Option<String>,
}

impl FieldConfig {
    pub fn new(field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            field_type,
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(FieldType::Text, label)
    }

    pub fn select<K, V>(label: impl Into<String>, options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::new(FieldType::Select, label)
        }
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(FieldType::Button, label)
    }

    pub fn checkbox(label: impl Into<String>) -> Self {
        Self::new(FieldType::Checkbox, label)
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn row_class(mut self, row_class: impl Into<String>) -> Self {
        self.row_class = row_class.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn multi_select(mut self) -> Self {
        self.multi_select = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}
