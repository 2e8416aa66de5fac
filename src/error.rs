use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum PaymentError {
    #[error("Transport error: {0}")]
    #[diagnostic(code(payflow::transport), help("the call is idempotent, retry it"))]
    Transport(String),
    #[error("Access token is invalid or expired")]
    #[diagnostic(code(payflow::invalid_token))]
    InvalidToken,
    #[error("Access token lacks the scope required for this call")]
    #[diagnostic(code(payflow::insufficient_scope))]
    InsufficientScope,
    #[error("Request rejected by server: {0}")]
    #[diagnostic(code(payflow::invalid_request))]
    InvalidRequest(String),
    #[error("Malformed server response: {0}")]
    #[diagnostic(code(payflow::invalid_response))]
    InvalidResponse(String),
    #[error("Response to {response} is missing mandatory field `{field}`")]
    #[diagnostic(code(payflow::missing_field))]
    MissingField {
        response: &'static str,
        field: &'static str,
    },
    #[error("Invalid state: {0}")]
    #[diagnostic(code(payflow::invalid_state))]
    InvalidState(String),
    #[error("Malformed saved state: {0}")]
    #[diagnostic(code(payflow::format))]
    Format(String),
    #[error("Validation error: {0}")]
    #[diagnostic(code(payflow::validation))]
    Validation(String),
    #[error("JSON error: {0}")]
    #[diagnostic(code(payflow::json))]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    #[diagnostic(code(payflow::io))]
    Io(#[from] std::io::Error),
}

impl PaymentError {
    /// True when calling the same method again is the expected reaction.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }

    /// True for errors the host must resolve by re-authorizing the session.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::InsufficientScope)
    }
}

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PaymentError::Transport("timeout".into()).is_recoverable());
        assert!(!PaymentError::InvalidToken.is_recoverable());
        assert!(PaymentError::InvalidToken.is_authorization());
        assert!(PaymentError::InsufficientScope.is_authorization());
        assert!(!PaymentError::Format("flags".into()).is_authorization());
    }

    #[test]
    fn test_missing_field_message() {
        let err = PaymentError::MissingField {
            response: "request-payment",
            field: "request_id",
        };
        assert_eq!(
            err.to_string(),
            "Response to request-payment is missing mandatory field `request_id`"
        );
    }
}
