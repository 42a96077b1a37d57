//! Template filling.
//!
//! The model maps collected data onto the template's `[PLACEHOLDER]`
//! markers, handles optional sections, and formats values. When the
//! response is not usable JSON, filling falls back to a deterministic
//! placeholder substitution over the serialized template so generation
//! never hard-fails on a malformed completion.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use docuflow_core::error::Result;
use docuflow_core::types::DataMap;
use docuflow_engine::parse_json_object;
use docuflow_llm::{ChatClient, ChatRequest};

/// Fills document templates with collected conversation data.
pub struct TemplateFiller {
    client: Arc<dyn ChatClient>,
}

impl TemplateFiller {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// Fill the template with collected data.
    ///
    /// The model handles placeholder mapping, optional sections, and value
    /// formatting; any unusable response degrades to plain `[KEY]`
    /// substitution rather than an error.
    pub async fn fill(&self, template: &Value, collected_data: &DataMap) -> Result<Value> {
        let prompt = fill_prompt(template, collected_data);
        let request = ChatRequest::user(prompt)
            .with_temperature(0.3)
            .with_max_tokens(4000);

        let response = match self.client.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Template fill completion failed; using placeholder substitution");
                return substitute_placeholders(template, collected_data);
            }
        };

        match parse_json_object(&response) {
            Ok(filled) => Ok(filled),
            Err(e) => {
                warn!(error = %e, "Template fill response was not JSON; using placeholder substitution");
                substitute_placeholders(template, collected_data)
            }
        }
    }
}

/// Deterministic `[KEY]` substitution over the serialized template.
///
/// Values are rendered with `to_string` semantics: strings insert their
/// text, other scalars their JSON form. Unmatched placeholders are left
/// in place.
pub fn substitute_placeholders(template: &Value, collected_data: &DataMap) -> Result<Value> {
    let mut rendered = serde_json::to_string(template)?;
    for (key, value) in collected_data {
        if value.is_null() {
            continue;
        }
        let placeholder = format!("[{}]", key);
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        // Substitution happens inside JSON string literals, so the value
        // must stay JSON-string safe.
        let escaped = escape_json_fragment(&replacement);
        rendered = rendered.replace(&placeholder, &escaped);
    }
    Ok(serde_json::from_str(&rendered)?)
}

/// Escape a plain-text fragment for splicing into a JSON string literal.
fn escape_json_fragment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn fill_prompt(template: &Value, collected_data: &DataMap) -> String {
    format!(
        r#"You are filling out a legal document template with collected data.

## Template Structure
```json
{template}
```

## Collected Data
```json
{collected}
```

## Your Task
Fill the template by:
1. Replacing all [PLACEHOLDER] markers with corresponding values from collected_data
2. Handling optional sections - include them if data exists, exclude if not
3. Formatting dates, numbers, and text appropriately
4. Ensuring legal language is preserved
5. Return the filled template as valid JSON

Respond with ONLY the filled JSON template, no other text."#,
        template = serde_json::to_string_pretty(template).unwrap_or_default(),
        collected = serde_json::to_string_pretty(collected_data).unwrap_or_default(),
    )
}
