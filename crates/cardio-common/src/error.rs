/// Error types for calls against the guidelines service.
///
/// Every variant is locally recoverable: the dashboard clears the affected result,
/// shows the message and leaves the input in place for a retry. Binary crates define
/// their own error enums and wrap `ApiError` via `#[from]`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{}: {}", status_line(.status), .message)]
    Upstream { status: StatusCode, message: String },

    #[error("{}", status_line(.status))]
    UpstreamBody { status: StatusCode, body: String },

    #[error("{0}")]
    Domain(String),
}

impl ApiError {
    /// HTTP status of the failed call, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Upstream { status, .. } | ApiError::UpstreamBody { status, .. } => {
                Some(*status)
            }
            ApiError::Request(e) => e.status(),
            ApiError::InvalidJson(_) | ApiError::Domain(_) => None,
        }
    }

    /// True when the service could not be reached (as opposed to answering with an error).
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Request(e) if e.is_connect() || e.is_timeout())
    }
}

fn status_line(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_includes_status_line() {
        let err = ApiError::Upstream {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "vector store not ready".to_string(),
        };
        assert_eq!(err.to_string(), "503 Service Unavailable: vector store not ready");
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn upstream_body_hides_raw_body_from_message() {
        let err = ApiError::UpstreamBody {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "<html>traceback</html>".to_string(),
        };
        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn domain_error_is_server_message_verbatim() {
        let err = ApiError::Domain("System not initialized".to_string());
        assert_eq!(err.to_string(), "System not initialized");
        assert!(err.status().is_none());
        assert!(!err.is_connection());
    }
}
