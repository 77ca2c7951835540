use thiserror::Error;

/// Failure of a single capability call.
///
/// The `Display` text is what the interface shows in place of a result, so
/// every variant renders as a complete human-readable line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid Token")]
    EmptyCredential,
    #[error("Error: {0}")]
    Transport(String),
    #[error("Error: unexpected response shape: {0}")]
    UnexpectedResponseShape(String),
    #[error("No audio file provided")]
    NoInputProvided,
    #[error("Error: API request failed with status {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("Error: {0}")]
    Io(String),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::EmptyCredential => "empty_credential",
            DispatchError::Transport(_) => "transport",
            DispatchError::UnexpectedResponseShape(_) => "unexpected_response_shape",
            DispatchError::NoInputProvided => "no_input",
            DispatchError::Remote { .. } => "remote",
            DispatchError::Io(_) => "io",
        }
    }

    pub(crate) fn remote(status: reqwest::StatusCode, body: &str) -> Self {
        DispatchError::Remote {
            status: status.as_u16(),
            message: summarize_error_body(body),
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DispatchError::UnexpectedResponseShape(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Io(err.to_string())
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Array(items) => {
                    let joined = items
                        .iter()
                        .filter_map(|item| item.as_str())
                        .collect::<Vec<_>>()
                        .join("; ");
                    (!joined.is_empty()).then_some(joined)
                }
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// One-line description of an error response body.
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            if !summary.is_empty() {
                return summary;
            }
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_matches_interface_messages() {
        assert_eq!(DispatchError::EmptyCredential.to_string(), "Invalid Token");
        assert_eq!(
            DispatchError::NoInputProvided.to_string(),
            "No audio file provided"
        );
        assert_eq!(
            DispatchError::Transport("connection refused".into()).to_string(),
            "Error: connection refused"
        );
        assert_eq!(
            DispatchError::Remote {
                status: 503,
                message: "Model is loading".into()
            }
            .to_string(),
            "Error: API request failed with status 503: Model is loading"
        );
    }

    #[test]
    fn summarize_prefers_structured_messages() {
        assert_eq!(
            summarize_error_body(r#"{"error":"Model is loading","estimated_time":20.5}"#),
            "Model is loading"
        );
        assert_eq!(
            summarize_error_body(r#"{"error":{"message":"quota   exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(
            summarize_error_body(r#"{"error":["bad input","too long"]}"#),
            "bad input; too long"
        );
        assert_eq!(summarize_error_body(r#"{"message":"nope"}"#), "nope");
    }

    #[test]
    fn summarize_falls_back_to_raw_text() {
        assert_eq!(summarize_error_body("  "), "<empty body>");
        assert_eq!(
            summarize_error_body("<html>\n  bad gateway\n</html>"),
            "<html> bad gateway </html>"
        );
        assert_eq!(summarize_error_body(r#"{"status":"failed"}"#), r#"{"status":"failed"}"#);
    }
}
