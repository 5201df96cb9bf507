//! phpIPAM response envelope interpretation
//!
//! phpIPAM wraps most answers as `{code, success, data}` but not always: some
//! installs return bare arrays, `success` may be missing, and "nothing here"
//! is sometimes a 404 and sometimes a 200 with `success: false`. Everything
//! shape-related is decided here, once, so callers only ever see a plain
//! value or a [`PhpIpamError`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{PhpIpamError, Result};

/// Messages phpIPAM uses for empty results ("Not found", "No subnets found")
fn not_found_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\b(not\s+found|no\s+[a-z ]*found)\b").ok())
        .as_ref()
}

/// Whether a remote message means "no such records"
pub fn is_not_found_message(message: &str) -> bool {
    not_found_pattern().is_some_and(|re| re.is_match(message))
}

/// Discriminated view of a parsed payload
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{success: false, message?}`
    Failure { message: Option<String> },
    /// `{data: ...}` (with or without `success: true`)
    Data(Value),
    /// Anything else, passed through untouched
    Bare(Value),
}

impl Envelope {
    pub fn classify(payload: Value) -> Self {
        match payload {
            Value::Object(mut map) => {
                if map.get("success") == Some(&Value::Bool(false)) {
                    let message = payload_message(&Value::Object(map));
                    Self::Failure { message }
                } else if map.contains_key("data") {
                    Self::Data(map.remove("data").unwrap_or(Value::Null))
                } else {
                    Self::Bare(Value::Object(map))
                }
            },
            other => Self::Bare(other),
        }
    }
}

/// `message` (or `error`) string carried by an error payload
fn payload_message(payload: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Interpret a parsed payload given the HTTP status of the response
pub fn interpret(status: u16, payload: Value, allow_not_found: bool) -> Result<Value> {
    if !(200..300).contains(&status) {
        if status == 404 && allow_not_found {
            return Ok(empty_list());
        }
        let message = payload_message(&payload).unwrap_or_else(|| format!("HTTP {}", status));
        return Err(PhpIpamError::remote(Some(status), message));
    }

    match Envelope::classify(payload) {
        Envelope::Failure { message } => {
            if allow_not_found && message.as_deref().is_some_and(is_not_found_message) {
                return Ok(empty_list());
            }
            Err(PhpIpamError::remote(
                Some(status),
                message.unwrap_or_else(|| "phpIPAM request failed".to_string()),
            ))
        },
        Envelope::Data(Value::Null) if allow_not_found => Ok(empty_list()),
        Envelope::Data(data) => Ok(data),
        Envelope::Bare(value) => Ok(value),
    }
}

/// Parse a raw response body and interpret it
///
/// An empty body is `null`. A body that is not JSON is an error for 2xx
/// responses; for error statuses it is ignored and the status decides.
pub fn decode(status: u16, body: &[u8], allow_not_found: bool) -> Result<Value> {
    let trimmed = body.trim_ascii();
    let payload = if trimmed.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(trimmed) {
            Ok(value) => value,
            Err(_) if (200..300).contains(&status) => {
                return Err(PhpIpamError::remote(
                    Some(status),
                    "phpIPAM returned an invalid JSON payload",
                ))
            },
            Err(_) => Value::Null,
        }
    };
    interpret(status, payload, allow_not_found)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_messages() {
        assert!(is_not_found_message("Not found"));
        assert!(is_not_found_message("No subnets found"));
        assert!(is_not_found_message("no locations FOUND"));
        assert!(!is_not_found_message("Invalid app code"));
        assert!(!is_not_found_message("Unknown error"));
    }

    #[test]
    fn test_data_envelope_unwrapped() {
        let value = interpret(200, json!({"code": 200, "success": true, "data": [1, 2]}), false)
            .unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_bare_payload_passed_through() {
        assert_eq!(interpret(200, json!([{"id": 1}]), false).unwrap(), json!([{"id": 1}]));
        assert_eq!(
            interpret(200, json!({"id": 1, "name": "x"}), false).unwrap(),
            json!({"id": 1, "name": "x"})
        );
    }

    #[test]
    fn test_null_data() {
        assert_eq!(interpret(200, json!({"data": null}), true).unwrap(), json!([]));
        assert_eq!(interpret(200, json!({"data": null}), false).unwrap(), Value::Null);
    }

    #[test]
    fn test_http_404() {
        assert_eq!(interpret(404, json!({"message": "Not found"}), true).unwrap(), json!([]));

        let err = interpret(404, json!({"message": "Not found"}), false).unwrap_err();
        assert_eq!(err, PhpIpamError::remote(Some(404), "Not found"));
    }

    #[test]
    fn test_error_status_without_message() {
        let err = interpret(500, Value::Null, true).unwrap_err();
        assert_eq!(err, PhpIpamError::remote(Some(500), "HTTP 500"));
    }

    #[test]
    fn test_success_false_envelopes() {
        let payload = json!({"code": 200, "success": false, "message": "No subnets found"});
        assert_eq!(interpret(200, payload.clone(), true).unwrap(), json!([]));
        assert_eq!(
            interpret(200, payload, false).unwrap_err(),
            PhpIpamError::remote(Some(200), "No subnets found")
        );

        let denied = json!({"success": false, "message": "Invalid app code"});
        assert_eq!(
            interpret(200, denied, true).unwrap_err(),
            PhpIpamError::remote(Some(200), "Invalid app code")
        );

        let silent = json!({"success": false});
        assert_eq!(
            interpret(200, silent, true).unwrap_err(),
            PhpIpamError::remote(Some(200), "phpIPAM request failed")
        );
    }

    #[test]
    fn test_decode_bodies() {
        assert_eq!(decode(200, b"", false).unwrap(), Value::Null);
        assert_eq!(decode(200, b"  \n", false).unwrap(), Value::Null);
        assert_eq!(decode(200, br#"{"data":{"1":{"id":1}}}"#, false).unwrap(), json!({"1": {"id": 1}}));

        let err = decode(200, b"<html>maintenance</html>", false).unwrap_err();
        assert!(matches!(err, PhpIpamError::Remote { status: Some(200), .. }));

        let err = decode(502, b"<html>bad gateway</html>", false).unwrap_err();
        assert_eq!(err, PhpIpamError::remote(Some(502), "HTTP 502"));

        assert_eq!(decode(404, b"<html>nope</html>", true).unwrap(), json!([]));
    }
}
