pub mod address;
pub mod country;
pub mod currency;
pub mod error;
pub mod gateway;
pub mod models;

pub use address::{Address, Contact, GatewayAddress, GatewayContact};
pub use currency::CurrencyCode;
pub use error::{AuthenticationError, GatewayError};
pub use gateway::GatewayClient;
pub use models::{
    AuthenticationSession, EnrollmentCheckResult, FormMethod, Recommendation, RedirectForm,
    StepUpResult, VerificationResult,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}
