//! LLM response parsing.
//!
//! Completion responses are requested in JSON mode, but providers still
//! occasionally wrap the object in a markdown code fence. Parsing tries the
//! raw text first and falls back to extracting a fenced block.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use docuflow_core::error::{DocuflowError, Result};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*(\{[\s\S]*\})\s*```").expect("Invalid fenced-JSON regex")
});

/// Parse a JSON object out of a completion response.
pub fn parse_json_object(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    if let Some(caps) = FENCED_JSON.captures(text) {
        return serde_json::from_str(&caps[1]).map_err(|e| {
            DocuflowError::Engine(format!("Fenced JSON in response did not parse: {}", e))
        });
    }

    Err(DocuflowError::Engine(
        "Response did not contain a JSON object".to_string(),
    ))
}
