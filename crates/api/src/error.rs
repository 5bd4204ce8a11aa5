use serde_json::Value;
use thiserror::Error;

const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Everything that can go wrong between a service call and a rendered view.
///
/// `SessionExpired` is the one variant with a side effect behind it: by the
/// time a caller sees it the stored token has already been purged, and the
/// shell is expected to route back to login.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An authenticated operation was attempted with no stored token.
    /// Fails before any network I/O.
    #[error("Authentication required")]
    AuthRequired,

    /// The server answered 401; the stored token has been discarded.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// Any other non-2xx response, message extracted from the body.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (DNS, refused connection, closed socket).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response whose body was not the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// True when the shell should drop to the login screen.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthRequired | ApiError::SessionExpired)
    }
}

/// Best-effort extraction of a human-readable message from an error body.
///
/// Priority order: a string body is its own message; then `detail`,
/// `message`, `error`; then the first remaining field (in key order) holding
/// a non-empty array (`"<field>: <first element>"`) or a string
/// (`"<field>: <value>"`); else a generic fallback.
pub fn extract_message(body: &Value) -> String {
    if let Value::String(text) = body {
        return text.clone();
    }

    let Some(fields) = body.as_object() else {
        return UNKNOWN_ERROR.to_string();
    };

    for key in ["detail", "message", "error"] {
        if let Some(Value::String(text)) = fields.get(key) {
            return text.clone();
        }
    }

    // Field-keyed errors, e.g. {"username": ["already taken"]}
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                if let Some(first) = items.first() {
                    return match first {
                        Value::String(text) => format!("{}: {}", key, text),
                        other => format!("{}: {}", key, other),
                    };
                }
            }
            Value::String(text) => return format!("{}: {}", key, text),
            _ => {}
        }
    }

    UNKNOWN_ERROR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_wins_over_everything() {
        let body = json!({
            "username": ["already taken"],
            "message": "secondary",
            "detail": "Invalid credentials"
        });
        assert_eq!(extract_message(&body), "Invalid credentials");
    }

    #[test]
    fn test_message_then_error_fallbacks() {
        let body = json!({"message": "Something broke"});
        assert_eq!(extract_message(&body), "Something broke");

        let body = json!({"error": "Nope"});
        assert_eq!(extract_message(&body), "Nope");
    }

    #[test]
    fn test_first_array_field_in_key_order() {
        let body = json!({
            "username": ["This field must be unique."],
            "email": ["Enter a valid email address."]
        });
        // serde_json objects iterate in key order, so "email" comes first
        assert_eq!(
            extract_message(&body),
            "email: Enter a valid email address."
        );
    }

    #[test]
    fn test_string_field_formatted_with_key() {
        let body = json!({"password": "too short"});
        assert_eq!(extract_message(&body), "password: too short");
    }

    #[test]
    fn test_empty_arrays_are_skipped() {
        let body = json!({"a": [], "b": ["real problem"]});
        assert_eq!(extract_message(&body), "b: real problem");
    }

    #[test]
    fn test_non_string_array_element_is_rendered() {
        let body = json!({"rating": [5]});
        assert_eq!(extract_message(&body), "rating: 5");
    }

    #[test]
    fn test_plain_string_body() {
        let body = json!("service unavailable");
        assert_eq!(extract_message(&body), "service unavailable");
    }

    #[test]
    fn test_unrecognized_shapes_fall_back() {
        assert_eq!(extract_message(&json!({"code": 42})), UNKNOWN_ERROR);
        assert_eq!(extract_message(&json!(null)), UNKNOWN_ERROR);
        assert_eq!(extract_message(&json!({})), UNKNOWN_ERROR);
    }
}
