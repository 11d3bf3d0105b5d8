use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepup_core::gateway::{
    AcsResultResponse, EnrollmentResponse, GatewayClient, GatewaySession, OrderTotals,
    ThreeDsConfig,
};
use stepup_core::GatewayError;
use stepup_shared::Masked;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::app_config::GatewayConfig;

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckEnrollmentBody<'a> {
    api_operation: &'static str,
    order: &'a OrderTotals,
    session: &'a GatewaySession,
    #[serde(rename = "3DSecure")]
    three_ds: &'a ThreeDsConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaResBlock<'a> {
    pa_res: &'a Masked<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessAcsResultBody<'a> {
    api_operation: &'static str,
    #[serde(rename = "3DSecure")]
    three_ds: PaResBlock<'a>,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorDetail {
    #[serde(default)]
    cause: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorDetail,
}

// ============================================================================
// Client
// ============================================================================

/// Mastercard Payment Gateway Services REST client (3-D Secure operations).
pub struct MpgsClient {
    http: reqwest::Client,
    merchant_url: Url,
    merchant_id: String,
    api_password: Masked<String>,
    timeout: Duration,
}

impl MpgsClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let merchant_url =
            Self::merchant_url(&config.api_endpoint, config.api_version, &config.merchant_id)?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build http client: {}", e)))?;

        debug!("MPGS client targeting {}", merchant_url);

        Ok(Self {
            http,
            merchant_url,
            merchant_id: config.merchant_id.clone(),
            api_password: config.api_password.clone(),
            timeout: config.timeout(),
        })
    }

    fn merchant_url(endpoint: &str, version: u32, merchant_id: &str) -> Result<Url, GatewayError> {
        let raw = format!(
            "{}/api/rest/version/{}/merchant/{}/",
            endpoint.trim_end_matches('/'),
            version,
            merchant_id
        );
        Url::parse(&raw).map_err(|e| {
            GatewayError::Transport(format!("invalid gateway endpoint {}: {}", raw, e))
        })
    }

    fn three_ds_url(&self, authentication_id: &str) -> Result<Url, GatewayError> {
        let mut url = self.merchant_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("gateway endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .push("3DSecureId")
            .push(authentication_id);
        Ok(url)
    }

    /// Ids are chosen by the merchant; the gateway echoes them back as `3DSecureId`.
    fn new_authentication_id() -> String {
        format!("3DS-{}", Uuid::new_v4().simple())
    }

    async fn send<B, R>(&self, method: Method, url: Url, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(format!("merchant.{}", self.merchant_id), Some(self.api_password.expose()))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Self::rejection(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Undecodable {} {} response: {}", method, url.path(), e);
            GatewayError::InvalidResponse(e.to_string())
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    fn rejection(status: StatusCode, body: &[u8]) -> GatewayError {
        let detail = serde_json::from_slice::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error)
            .unwrap_or_default();

        GatewayError::Rejected {
            status: status.as_u16(),
            cause: detail.cause,
            explanation: detail.explanation,
        }
    }
}

#[async_trait]
impl GatewayClient for MpgsClient {
    async fn check_3ds_enrollment(
        &self,
        three_ds: &ThreeDsConfig,
        order: &OrderTotals,
        session: &GatewaySession,
    ) -> Result<EnrollmentResponse, GatewayError> {
        let authentication_id = Self::new_authentication_id();
        let url = self.three_ds_url(&authentication_id)?;

        let body = CheckEnrollmentBody {
            api_operation: "CHECK_3DS_ENROLLMENT",
            order,
            session,
            three_ds,
        };

        let mut response: EnrollmentResponse = self.send(Method::PUT, url, &body).await?;
        if response.three_ds_id.is_none() {
            response.three_ds_id = Some(authentication_id);
        }
        Ok(response)
    }

    async fn process_acs_result(
        &self,
        authentication_id: &str,
        pa_res: &Masked<String>,
    ) -> Result<AcsResultResponse, GatewayError> {
        let url = self.three_ds_url(authentication_id)?;

        let body = ProcessAcsResultBody {
            api_operation: "PROCESS_ACS_RESULT",
            three_ds: PaResBlock { pa_res },
        };

        self.send(Method::POST, url, &body).await
    }
}
