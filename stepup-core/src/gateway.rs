use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stepup_shared::Masked;
use url::Url;

use crate::currency::CurrencyCode;
use crate::error::GatewayError;
use crate::models::{FormMethod, Recommendation, RedirectForm, VerificationResult};

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageGenerationMode {
    /// Gateway returns the ACS url and PaReq, the merchant renders the form.
    Customized,
    /// Gateway returns a ready made HTML page.
    Simple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRedirectRequest {
    pub page_generation_mode: PageGenerationMode,
    pub response_url: Url,
}

/// The `3DSecure` block of an enrollment check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDsConfig {
    pub authentication_redirect: AuthenticationRedirectRequest,
}

impl ThreeDsConfig {
    pub fn customized(response_url: Url) -> Self {
        Self {
            authentication_redirect: AuthenticationRedirectRequest {
                page_generation_mode: PageGenerationMode::Customized,
                response_url,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTotals {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySession {
    pub id: String,
}

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayVerdict {
    pub gateway_recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizedRedirect {
    pub acs_url: Url,
    pub pa_req: String,
}

impl From<&CustomizedRedirect> for RedirectForm {
    fn from(redirect: &CustomizedRedirect) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("PaReq".to_string(), redirect.pa_req.clone());

        RedirectForm {
            endpoint: redirect.acs_url.clone(),
            method: FormMethod::Post,
            fields,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRedirect {
    pub customized: Option<CustomizedRedirect>,
    pub simple: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentThreeDs {
    pub authentication_redirect: Option<AuthenticationRedirect>,
    pub ve_res_enrolled: Option<String>,
    pub summary_status: Option<String>,
    pub xid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    #[serde(rename = "3DSecureId")]
    pub three_ds_id: Option<String>,
    #[serde(rename = "3DSecure", default)]
    pub three_ds: Option<EnrollmentThreeDs>,
    pub response: GatewayVerdict,
}

impl EnrollmentResponse {
    /// The customized ACS redirect, present only when step-up is required.
    pub fn redirect_form(&self) -> Option<RedirectForm> {
        self.three_ds
            .as_ref()?
            .authentication_redirect
            .as_ref()?
            .customized
            .as_ref()
            .map(RedirectForm::from)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcsResultThreeDs {
    pub acs_eci: Option<String>,
    pub authentication_token: Option<Masked<String>>,
    pub pa_res_status: Option<String>,
    pub ve_res_enrolled: Option<String>,
    pub xid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcsResultResponse {
    #[serde(rename = "3DSecureId")]
    pub three_ds_id: Option<String>,
    #[serde(rename = "3DSecure", default)]
    pub three_ds: Option<AcsResultThreeDs>,
    pub response: GatewayVerdict,
}

impl From<AcsResultResponse> for VerificationResult {
    fn from(response: AcsResultResponse) -> Self {
        let three_ds = response.three_ds.unwrap_or_default();
        VerificationResult {
            recommendation: response.response.gateway_recommendation,
            eci: three_ds.acs_eci,
            authentication_token: three_ds.authentication_token,
            payer_authentication_response_status: three_ds.pa_res_status,
            enrollment_status: three_ds.ve_res_enrolled,
            transaction_id: three_ds.xid,
        }
    }
}

// ============================================================================
// Client seam
// ============================================================================

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Ask whether the payer session needs step-up authentication.
    async fn check_3ds_enrollment(
        &self,
        three_ds: &ThreeDsConfig,
        order: &OrderTotals,
        session: &GatewaySession,
    ) -> Result<EnrollmentResponse, GatewayError>;

    /// Hand the signed ACS response to the gateway for validation.
    async fn process_acs_result(
        &self,
        authentication_id: &str,
        pa_res: &Masked<String>,
    ) -> Result<AcsResultResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_response_with_redirect() {
        let json = r#"{
            "3DSecure": {
                "authenticationRedirect": {
                    "customized": {
                        "acsUrl": "https://acs.issuer.example/pareq",
                        "paReq": "eAFVUe1ugjAU"
                    }
                },
                "summaryStatus": "CARD_ENROLLED",
                "veResEnrolled": "Y",
                "xid": "pBzJJ4Hmw3MiUcpHOtvB4bg="
            },
            "3DSecureId": "3ds-0c3a5bd2",
            "merchant": "TESTMERCHANT",
            "response": {
                "3DSecure": { "gatewayCode": "CARD_ENROLLED" },
                "gatewayRecommendation": "PROCEED"
            }
        }"#;

        let response: EnrollmentResponse = serde_json::from_str(json).unwrap();
        assert!(response.response.gateway_recommendation.is_proceed());
        assert_eq!(response.three_ds_id.as_deref(), Some("3ds-0c3a5bd2"));

        let form = response.redirect_form().unwrap();
        assert_eq!(form.endpoint.as_str(), "https://acs.issuer.example/pareq");
        assert_eq!(form.method, FormMethod::Post);
        assert_eq!(form.fields.get("PaReq").map(String::as_str), Some("eAFVUe1ugjAU"));
    }

    #[test]
    fn test_enrollment_response_without_redirect() {
        let json = r#"{
            "3DSecure": { "summaryStatus": "CARD_NOT_ENROLLED", "veResEnrolled": "N" },
            "3DSecureId": "3ds-1",
            "response": { "gatewayRecommendation": "PROCEED" }
        }"#;

        let response: EnrollmentResponse = serde_json::from_str(json).unwrap();
        assert!(response.redirect_form().is_none());
    }

    #[test]
    fn test_acs_result_maps_field_for_field() {
        let json = r#"{
            "3DSecure": {
                "acsEci": "05",
                "authenticationToken": "gIGCg4SFhoeIiYqLjI2Ojw==",
                "paResStatus": "Y",
                "veResEnrolled": "Y",
                "xid": "pBzJJ4Hmw3MiUcpHOtvB4bg="
            },
            "3DSecureId": "3ds-0c3a5bd2",
            "response": { "gatewayRecommendation": "PROCEED" }
        }"#;

        let response: AcsResultResponse = serde_json::from_str(json).unwrap();
        let result = VerificationResult::from(response);

        assert_eq!(result.recommendation, Recommendation::Proceed);
        assert_eq!(result.eci.as_deref(), Some("05"));
        assert_eq!(
            result.authentication_token.as_ref().map(|t| t.expose().as_str()),
            Some("gIGCg4SFhoeIiYqLjI2Ojw==")
        );
        assert_eq!(result.payer_authentication_response_status.as_deref(), Some("Y"));
        assert_eq!(result.enrollment_status.as_deref(), Some("Y"));
        assert_eq!(result.transaction_id.as_deref(), Some("pBzJJ4Hmw3MiUcpHOtvB4bg="));
    }

    #[test]
    fn test_three_ds_config_serialization() {
        let config = ThreeDsConfig::customized(Url::parse("https://shop.example/pay").unwrap());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value["authenticationRedirect"]["pageGenerationMode"],
            "CUSTOMIZED"
        );
        assert_eq!(
            value["authenticationRedirect"]["responseUrl"],
            "https://shop.example/pay"
        );
    }
}
