//! z/OSMF error body, as returned with non-2xx statuses.

use serde::{Deserialize, Serialize};

/// z/OSMF error response body: the IBM z/OSMF JSON error format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZosmfErrorBody {
    /// Return code.
    pub rc: i32,
    /// Reason code.
    pub reason: i32,
    /// Error category.
    #[serde(default)]
    pub category: i32,
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
    /// Additional error details.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Stack trace information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ZosmfErrorBody {
    /// Parse an error body, returning `None` for anything that is not one.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"rc":8,"reason":0,"category":4,"message":"TSO session 'K' not found"}"#;
        let parsed = ZosmfErrorBody::parse(body).unwrap();
        assert_eq!(parsed.rc, 8);
        assert_eq!(parsed.category, 4);
        assert_eq!(parsed.message, "TSO session 'K' not found");
        assert!(parsed.details.is_empty());
    }

    #[test]
    fn test_parse_non_error_body() {
        assert!(ZosmfErrorBody::parse("<html>gateway timeout</html>").is_none());
        assert!(ZosmfErrorBody::parse(r#"{"servletKey":"K"}"#).is_none());
    }
}
