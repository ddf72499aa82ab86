//! Settings field markup.

use std::fmt::Write;

use super::types::{FieldConfig, FieldType};
use crate::util::escape_html;

/// Render one settings field as an HTML fragment.
///
/// The field is wrapped in a row `div` carrying the field id and the row
/// class. An empty `id` renders nothing; an unknown field type renders the
/// row with an empty body.
pub fn render_settings_field(id: &str, config: &FieldConfig) -> String {
    if id.is_empty() {
        return String::new();
    }

    let id = escape_html(id);
    let label = escape_html(&config.label);
    let class = escape_html(&config.class);

    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        html,
        r#"<div class="sjea-field-wrap sjea-field-{id}-wrap {}">"#,
        escape_html(&config.row_class)
    );

    match config.field_type {
        FieldType::Text => {
            let _ = write!(
                html,
                r#"<div class="sjea-field-label"><label for="{id}">{label}</label></div><div class="sjea-field-input"><input type="text" name="{id}" class="{class}" />"#
            );
            if let Some(help) = &config.help {
                let _ = write!(html, r#"<p class="sjea-field-help">{}</p>"#, escape_html(help));
            }
            html.push_str("</div>");
        }
        FieldType::Select => {
            let multiple = if config.multi_select { " multiple" } else { "" };
            let selected_value = config.default.as_deref().unwrap_or("");

            let _ = write!(
                html,
                r#"<div class="sjea-field-label"><label for="{id}">{label}</label></div><div class="sjea-field-input"><select name="{id}" class="{class}"{multiple}>"#
            );
            for (value, text) in &config.options {
                let selected = if value == selected_value { " selected" } else { "" };
                let _ = write!(
                    html,
                    r#"<option value="{}"{selected}>{}</option>"#,
                    escape_html(value),
                    escape_html(text)
                );
            }
            html.push_str("</select></div>");
        }
        FieldType::Button => {
            let _ = write!(
                html,
                r#"<div class="sjea-field-label"></div><div class="sjea-field-input"><span class="sjea-button button {class}">{label}</span></div>"#
            );
        }
        FieldType::Checkbox => {
            let _ = write!(
                html,
                r#"<p><input type="checkbox" value="true" name="{id}" class="{class} cp-customizer-input" /><label><strong>{label}</strong></label></p>"#
            );
        }
        FieldType::Other => {}
    }

    html.push_str("</div>");
    html
}
