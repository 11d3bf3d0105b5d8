use std::time::Duration;

use crate::models::Recommendation;

/// Failures talking to the payment gateway. None of these is a decline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway did not answer within {0:?}")]
    Timeout(Duration),
    #[error("gateway transport failure: {0}")]
    Transport(String),
    #[error("gateway rejected the request (HTTP {status}): {cause} {explanation}")]
    Rejected {
        status: u16,
        cause: String,
        explanation: String,
    },
    #[error("gateway response could not be decoded: {0}")]
    InvalidResponse(String),
    #[error("circuit breaker [{0}] is open")]
    CircuitOpen(String),
}

impl GatewayError {
    /// Failures that say something about gateway health rather than about the
    /// request itself. Only these trip the circuit breaker.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout(_) | GatewayError::Transport(_) => true,
            GatewayError::Rejected { status, .. } => *status >= 500,
            GatewayError::InvalidResponse(_) | GatewayError::CircuitOpen(_) => false,
        }
    }
}

/// Every way the step-up handshake can interrupt a checkout.
///
/// All kinds end the same way for the shopper (checkout aborted, message shown,
/// back to order review). `GatewayUnavailable` is kept apart so logs and
/// metrics can tell an outage from a decline.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error(
        "3-D Secure result is missing the authentication id or the payer authentication response"
    )]
    MissingAuthenticationData,
    #[error("3-D Secure result belongs to authentication {received}, expected {expected}")]
    AuthenticationIdMismatch { expected: String, received: String },
    #[error("authentication session is invalid: {0}")]
    InvalidSession(String),
    #[error("gateway declined the enrollment check ({0})")]
    GatewayDeclined(Recommendation),
    #[error("gateway declined the 3-D Secure authentication ({0})")]
    AuthenticationDeclined(Recommendation),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(#[from] GatewayError),
}

impl AuthenticationError {
    /// Text shown to the shopper on the order review page.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthenticationError::GatewayDeclined(_) => "Your payment was declined.",
            AuthenticationError::AuthenticationDeclined(_) => {
                "Your payment was declined by 3D Secure."
            }
            AuthenticationError::MissingAuthenticationData
            | AuthenticationError::AuthenticationIdMismatch { .. }
            | AuthenticationError::InvalidSession(_)
            | AuthenticationError::GatewayUnavailable(_) => "Payment error occurred (3D Secure).",
        }
    }

    /// Stable label for metrics and events.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthenticationError::MissingAuthenticationData => "missing_authentication_data",
            AuthenticationError::AuthenticationIdMismatch { .. } => "authentication_id_mismatch",
            AuthenticationError::InvalidSession(_) => "invalid_session",
            AuthenticationError::GatewayDeclined(_) => "gateway_declined",
            AuthenticationError::AuthenticationDeclined(_) => "authentication_declined",
            AuthenticationError::GatewayUnavailable(_) => "gateway_unavailable",
        }
    }

    pub fn is_decline(&self) -> bool {
        matches!(
            self,
            AuthenticationError::GatewayDeclined(_) | AuthenticationError::AuthenticationDeclined(_)
        )
    }
}
