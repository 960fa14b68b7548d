use serde_json::Value;

use crate::models::SubmissionInput;

/// True when the Content-Type header declares JSON (parameters such as charset are ignored).
pub fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// Parse a JSON request body into a submission. An empty body is an empty submission,
/// which the validator then rejects field by field.
pub fn parse_body(body: &[u8]) -> Result<SubmissionInput, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SubmissionInput::default());
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {e}"))?;

    // Derived struct visitors also take arrays by position; only objects are submissions
    if !value.is_object() {
        return Err("Invalid JSON body: expected an object".to_string());
    }

    serde_json::from_value(value).map_err(|e| format!("Invalid JSON body: {e}"))
}
