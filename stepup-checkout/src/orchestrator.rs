use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use stepup_core::gateway::{GatewayClient, GatewaySession, OrderTotals, ThreeDsConfig};
use stepup_core::{
    AuthenticationError, AuthenticationSession, EnrollmentCheckResult, GatewayError,
    StepUpResult, VerificationResult,
};
use tracing::{debug, info};

use crate::models::{Decision, StepUpChallenge, StepUpState};
use crate::return_url::ReturnUrlBuilder;

/// Drives the two gateway round trips of a 3-D Secure step-up.
///
/// Holds no per-checkout state: everything needed to match the ACS post-back to
/// its enrollment check travels in the return URL.
pub struct StepUpOrchestrator {
    gateway: Arc<dyn GatewayClient>,
    timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum EnrollmentOutcome {
    StepUpRequired(StepUpChallenge),
    NotRequired(EnrollmentCheckResult),
}

impl EnrollmentOutcome {
    pub fn state(&self) -> StepUpState {
        match self {
            EnrollmentOutcome::StepUpRequired(_) => StepUpState::AwaitingStepUp,
            EnrollmentOutcome::NotRequired(_) => StepUpState::Resolved(Decision::Proceed),
        }
    }

    pub fn result(&self) -> &EnrollmentCheckResult {
        match self {
            EnrollmentOutcome::StepUpRequired(challenge) => &challenge.result,
            EnrollmentOutcome::NotRequired(result) => result,
        }
    }
}

impl StepUpOrchestrator {
    pub fn new(gateway: Arc<dyn GatewayClient>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Ask the gateway whether the session needs step-up.
    pub async fn check_enrollment(
        &self,
        session: &AuthenticationSession,
    ) -> Result<EnrollmentOutcome, AuthenticationError> {
        session.validate()?;

        let urls = ReturnUrlBuilder::new(&session.return_url);
        let three_ds = ThreeDsConfig::customized(urls.response_url());
        let order = OrderTotals {
            amount: session.order_amount,
            currency: session.currency.clone(),
        };
        let gateway_session = GatewaySession {
            id: session.session_id.clone(),
        };

        let response = self
            .bounded(self.gateway.check_3ds_enrollment(&three_ds, &order, &gateway_session))
            .await?;

        let recommendation = response.response.gateway_recommendation.clone();
        if !recommendation.is_proceed() {
            return Err(AuthenticationError::GatewayDeclined(recommendation));
        }

        let redirect_form = response.redirect_form();
        let result = EnrollmentCheckResult {
            recommendation,
            authentication_id: response.three_ds_id.clone(),
            redirect_form,
        };

        if result.redirect_form.is_none() {
            debug!("Session {} needs no step-up", session.session_id);
            return Ok(EnrollmentOutcome::NotRequired(result));
        }

        let authentication_id = result.authentication_id.clone().ok_or_else(|| {
            GatewayError::InvalidResponse(
                "enrollment response requires step-up but carries no 3DSecureId".to_string(),
            )
        })?;

        let return_url = urls.step_up_return_url(
            &authentication_id,
            &session.session_id,
            session.session_version.as_deref(),
        );
        info!(
            "Step-up required for session {}, authentication {}",
            session.session_id, authentication_id
        );

        Ok(EnrollmentOutcome::StepUpRequired(StepUpChallenge { result, return_url }))
    }

    /// Verify the ACS outcome. `authentication_id` is the id round-tripped in the
    /// return URL; the step-up result must agree with it when it names one.
    pub async fn verify_step_up(
        &self,
        authentication_id: Option<&str>,
        step_up: &StepUpResult,
    ) -> Result<VerificationResult, AuthenticationError> {
        let authentication_id = authentication_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AuthenticationError::MissingAuthenticationData)?;

        let pa_res = step_up
            .payer_authentication_response
            .as_ref()
            .filter(|p| !p.is_blank())
            .ok_or(AuthenticationError::MissingAuthenticationData)?;

        if let Some(received) = step_up.authentication_id.as_deref() {
            if received.trim() != authentication_id {
                return Err(AuthenticationError::AuthenticationIdMismatch {
                    expected: authentication_id.to_string(),
                    received: received.to_string(),
                });
            }
        }

        let response = self
            .bounded(self.gateway.process_acs_result(authentication_id, pa_res))
            .await?;

        let result = VerificationResult::from(response);
        if !result.recommendation.is_proceed() {
            return Err(AuthenticationError::AuthenticationDeclined(result.recommendation));
        }

        info!("Authentication {} verified", authentication_id);
        Ok(result)
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }
}
