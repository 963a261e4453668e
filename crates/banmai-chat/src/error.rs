use thiserror::Error;

/// Errors from the external completion service.
///
/// All of these are absorbed at the engine boundary; `respond` degrades to
/// a direct-match answer or a fixed apology instead of propagating them.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service is not configured")]
    NotConfigured,

    #[error("completion request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Http(err.to_string())
        }
    }
}

/// Errors from an outbound message sink.
///
/// Dispatch logs these and drops them; retry policy belongs to the sink's
/// platform, not this core.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink is not configured")]
    NotConfigured,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_error_display() {
        assert_eq!(
            CompletionError::NotConfigured.to_string(),
            "completion service is not configured"
        );
        assert_eq!(
            CompletionError::Timeout.to_string(),
            "completion request timed out"
        );
        let err = CompletionError::Status {
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "completion service returned status 429: quota"
        );
    }

    #[test]
    fn test_sink_error_display() {
        assert_eq!(
            SinkError::NotConfigured.to_string(),
            "sink is not configured"
        );
        let err = SinkError::Delivery("recipient unknown".to_string());
        assert_eq!(err.to_string(), "delivery failed: recipient unknown");
    }
}
