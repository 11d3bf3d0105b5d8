use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use stepup_shared::Masked;
use url::Url;

use crate::currency::CurrencyCode;
use crate::error::AuthenticationError;

/// The gateway's verdict on whether the transaction should continue.
///
/// Codes the gateway may add later are kept verbatim in `Other` so they show
/// up in logs instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recommendation {
    Proceed,
    DoNotProceed,
    Other(String),
}

impl Recommendation {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Recommendation::Proceed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Recommendation::Proceed => "PROCEED",
            Recommendation::DoNotProceed => "DO_NOT_PROCEED",
            Recommendation::Other(code) => code,
        }
    }
}

impl From<String> for Recommendation {
    fn from(code: String) -> Self {
        match code.as_str() {
            "PROCEED" => Recommendation::Proceed,
            "DO_NOT_PROCEED" => Recommendation::DoNotProceed,
            _ => Recommendation::Other(code),
        }
    }
}

impl From<Recommendation> for String {
    fn from(recommendation: Recommendation) -> Self {
        recommendation.as_str().to_string()
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout attempt that may need step-up authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationSession {
    pub session_id: String,
    pub session_version: Option<String>,
    pub order_amount: Decimal,
    pub currency: CurrencyCode,
    /// Controller URL the ACS sends the cardholder back to.
    pub return_url: Url,
}

impl AuthenticationSession {
    pub fn validate(&self) -> Result<(), AuthenticationError> {
        if self.session_id.trim().is_empty() {
            return Err(AuthenticationError::InvalidSession(
                "session id is empty".to_string(),
            ));
        }
        if self.order_amount <= Decimal::ZERO {
            return Err(AuthenticationError::InvalidSession(format!(
                "order amount must be positive, got {}",
                self.order_amount
            )));
        }
        if !matches!(self.return_url.scheme(), "http" | "https")
            || self.return_url.host().is_none()
        {
            return Err(AuthenticationError::InvalidSession(format!(
                "return url {} is not an absolute http(s) url",
                self.return_url
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    Get,
    Post,
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormMethod::Get => f.write_str("GET"),
            FormMethod::Post => f.write_str("POST"),
        }
    }
}

/// What the browser has to submit to hand control to the issuer's ACS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectForm {
    pub endpoint: Url,
    pub method: FormMethod,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentCheckResult {
    pub recommendation: Recommendation,
    /// Only issued when step-up is required.
    pub authentication_id: Option<String>,
    pub redirect_form: Option<RedirectForm>,
}

impl EnrollmentCheckResult {
    pub fn requires_step_up(&self) -> bool {
        self.recommendation.is_proceed() && self.redirect_form.is_some()
    }
}

/// What came back from the browser after the ACS interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepUpResult {
    pub authentication_id: Option<String>,
    pub payer_authentication_response: Option<Masked<String>>,
}

/// Proof of authentication handed to the capture step. Field names follow the
/// gateway's `3DSecure` block so it can be forwarded without remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    #[serde(rename = "gatewayRecommendation")]
    pub recommendation: Recommendation,
    #[serde(rename = "acsEci")]
    pub eci: Option<String>,
    pub authentication_token: Option<Masked<String>>,
    #[serde(rename = "paResStatus")]
    pub payer_authentication_response_status: Option<String>,
    #[serde(rename = "veResEnrolled")]
    pub enrollment_status: Option<String>,
    #[serde(rename = "xid")]
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session(amount: Decimal, return_url: &str) -> AuthenticationSession {
        AuthenticationSession {
            session_id: "SESSION0002".to_string(),
            session_version: Some("e3f144ce02".to_string()),
            order_amount: amount,
            currency: CurrencyCode::parse("USD").unwrap(),
            return_url: Url::parse(return_url).unwrap(),
        }
    }

    #[test]
    fn test_recommendation_round_trip() {
        let r: Recommendation = serde_json::from_str("\"PROCEED\"").unwrap();
        assert_eq!(r, Recommendation::Proceed);

        let r: Recommendation =
            serde_json::from_str("\"RESUBMIT_WITH_ALTERNATIVE_PAYMENT_DETAILS\"").unwrap();
        assert_eq!(
            r,
            Recommendation::Other("RESUBMIT_WITH_ALTERNATIVE_PAYMENT_DETAILS".to_string())
        );
        assert!(!r.is_proceed());
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            "\"RESUBMIT_WITH_ALTERNATIVE_PAYMENT_DETAILS\""
        );
    }

    #[test]
    fn test_session_validation() {
        assert!(session(dec!(100.00), "https://shop.example/checkout").validate().is_ok());

        let err = session(dec!(0), "https://shop.example/checkout").validate().unwrap_err();
        assert!(matches!(err, AuthenticationError::InvalidSession(_)));

        let err = session(dec!(-5), "https://shop.example/checkout").validate().unwrap_err();
        assert!(matches!(err, AuthenticationError::InvalidSession(_)));

        let err = session(dec!(10), "mailto:shop@example.com").validate().unwrap_err();
        assert!(matches!(err, AuthenticationError::InvalidSession(_)));
    }

    #[test]
    fn test_verification_result_uses_gateway_names() {
        let result = VerificationResult {
            recommendation: Recommendation::Proceed,
            eci: Some("05".to_string()),
            authentication_token: Some(Masked::new("gIGCg4SFhoeIiYqLjI2Ojw==".to_string())),
            payer_authentication_response_status: Some("Y".to_string()),
            enrollment_status: Some("Y".to_string()),
            transaction_id: Some("pBzJJ4Hmw3MiUcpHOtvB4bg=".to_string()),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["gatewayRecommendation"], "PROCEED");
        assert_eq!(value["acsEci"], "05");
        assert_eq!(value["authenticationToken"], "gIGCg4SFhoeIiYqLjI2Ojw==");
        assert_eq!(value["paResStatus"], "Y");
        assert_eq!(value["veResEnrolled"], "Y");
        assert_eq!(value["xid"], "pBzJJ4Hmw3MiUcpHOtvB4bg=");
    }
}
