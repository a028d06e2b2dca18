use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the backend on non-2xx responses.
///
/// `detail` is a string for ordinary HTTP errors and an array of validation
/// entries for malformed requests (HTTP 422).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ErrorDetail {
    /// Raw `detail` value as sent by the backend.
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorDetail {
    /// Creates an error body with a string detail.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(Value::String(detail.into())),
        }
    }

    /// The detail text, if the backend sent a plain string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    /// Parses a response body, yielding an empty detail for anything that
    /// is not a JSON object.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.message(), &self.detail) {
            (Some(text), _) => f.write_str(text),
            (None, Some(other)) => write!(f, "{other}"),
            (None, None) => f.write_str("no detail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_detail() {
        let error = ErrorDetail::from_body(r#"{"detail": "Activity full"}"#);
        assert_eq!(error.message(), Some("Activity full"));
        assert_eq!(error.to_string(), "Activity full");
    }

    #[test]
    fn test_validation_detail_is_not_a_message() {
        let body = r#"{"detail": [{"loc": ["query", "email"], "msg": "field required"}]}"#;
        let error = ErrorDetail::from_body(body);
        assert!(error.detail.is_some());
        assert_eq!(error.message(), None);
        assert!(error.to_string().contains("field required"));
    }

    #[test]
    fn test_non_json_body() {
        let error = ErrorDetail::from_body("<html>Bad Gateway</html>");
        assert_eq!(error, ErrorDetail::default());
        assert_eq!(error.to_string(), "no detail");
    }

    #[test]
    fn test_blank_detail_is_ignored() {
        let error = ErrorDetail::new("   ");
        assert_eq!(error.message(), None);
    }

    #[test]
    fn test_serializes_as_detail_object() {
        let json = serde_json::to_string(&ErrorDetail::new("Activity not found")).unwrap();
        assert_eq!(json, r#"{"detail":"Activity not found"}"#);
    }
}
