//! Error taxonomy for prediction payloads and the transport that delivers them.

use thiserror::Error;

/// Failure while obtaining or decoding a prediction.
///
/// Every variant is caught at the session's submission boundary and turned
/// into the single user-visible error surface; none of them leave partial state.
#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    /// Payload is structurally invalid (missing field, wrong type, bad JSON)
    #[error("Malformed prediction response: {0}")]
    MalformedResponse(String),

    /// Payload is valid JSON but names a category we do not know
    #[error("Unknown event category: {0}")]
    UnknownCategory(String),

    /// Request never reached the server or was rejected at the HTTP layer
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// HTTP/network level failure talking to the model server.
///
/// The `Display` output is the exact message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Error response from model server {status_text} {status}")]
    Status { status: u16, status_text: String },

    #[error("Connection to model server failed!")]
    Connection(String),
}

impl PredictionError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse(detail.into())
    }
}

impl From<serde_json::Error> for PredictionError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Invalid user-supplied configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Score for '{kind}' out of range: {score} (allowed 0..={max})")]
    ScoreOutOfRange { kind: String, score: i64, max: u8 },

    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    #[error("Unknown smoothing strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown score policy: {0}")]
    UnknownPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = PredictionError::from(TransportError::Status {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Error response from model server Internal Server Error 500"
        );
    }

    #[test]
    fn test_connection_message() {
        let err = PredictionError::from(TransportError::Connection("refused".to_string()));
        assert_eq!(err.to_string(), "Connection to model server failed!");
    }

    #[test]
    fn test_json_error_is_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PredictionError::from(json_err);
        assert!(matches!(err, PredictionError::MalformedResponse(_)));
    }
}
