use reqwest::StatusCode;

/// Errors from calls to the babytrack API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport or body decoding error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Status of an API error, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Best-effort message for a failed response: the body's `error` or
/// `message` field, else the raw body, else the status reason.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
        for key in ["error", "message"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                if !msg.is_empty() {
                    return msg.clone();
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_then_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            extract_error_message(status, r#"{"error":"bad","message":"other"}"#),
            "bad"
        );
        assert_eq!(extract_error_message(status, r#"{"message":"other"}"#), "other");
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(
            extract_error_message(StatusCode::NOT_FOUND, ""),
            "Not Found"
        );
        // JSON without a usable field is shown as-is
        assert_eq!(
            extract_error_message(StatusCode::CONFLICT, r#"{"error":""}"#),
            r#"{"error":""}"#
        );
    }

    #[test]
    fn status_only_for_api_errors() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            message: "gone".into(),
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "API error (404 Not Found): gone");
        assert_eq!(ClientError::Config("x".into()).status(), None);
    }
}
