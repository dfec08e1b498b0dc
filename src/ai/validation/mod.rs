//! AI Response Validation
//!
//! Turns raw collaborator text into structured JSON:
//! - JSON repair for malformed responses
//! - Explicit parse-failed sentinel when repair is impossible
//!
//! A pipeline sub-task never fails because the model answered in prose;
//! it records the sentinel `{"parse_failed": true, "raw_preview": "..."}`
//! and downstream consumers check [`is_parse_failed`].

mod json_repair;

pub use json_repair::JsonRepairer;

use serde_json::{Value, json};
use tracing::warn;

use crate::constants::pipeline::RAW_PREVIEW_CHARS;
use crate::types::{AuditError, Result, truncate_chars};

/// Sentinel field marking an unparseable response
pub const PARSE_FAILED_KEY: &str = "parse_failed";

/// Build the parse-failed sentinel for raw text
pub fn parse_failed_sentinel(raw: &str) -> Value {
    json!({
        (PARSE_FAILED_KEY): true,
        "raw_preview": truncate_chars(raw.trim(), RAW_PREVIEW_CHARS),
    })
}

/// True when `value` is the parse-failed sentinel
pub fn is_parse_failed(value: &Value) -> bool {
    value
        .get(PARSE_FAILED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Parse a structured (object-shaped) response, repairing if needed
pub fn parse_structured(raw: &str) -> Result<Value> {
    let (value, _) = JsonRepairer::new().parse_or_repair(raw)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(AuditError::malformed("structured response", raw))
    }
}

/// Parse a structured response or fall back to the sentinel
pub fn parse_or_sentinel(raw: &str, operation: &str) -> Value {
    match parse_structured(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(operation, error = %e, "Unparseable response, recording parse-failed sentinel");
            parse_failed_sentinel(raw)
        }
    }
}
