//! Redaction of sensitive fields before anything reaches disk.
//!
//! This is a fixed denylist of exact, case-sensitive key names, applied at
//! every depth of the payload. It is not pattern-based PII scrubbing.

use serde_json::Value;

/// Replacement value written in place of a redacted field.
pub const REDACTED: &str = "[REDACTED]";

/// Keys whose values are never persisted.
pub const SENSITIVE_KEYS: [&str; 6] = ["password", "token", "secret", "apiKey", "ssn", "creditCard"];

/// Return `value` with every sensitive key's value replaced by [`REDACTED`].
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    if SENSITIVE_KEYS.contains(&key.as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, sanitize(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}
