use std::sync::Arc;
use stepup_core::{AuthenticationError, AuthenticationSession, StepUpResult, VerificationResult};
use stepup_shared::models::{
    CheckoutAbortedEvent, CheckoutEvent, EnrollmentCheckedEvent, StepUpVerifiedEvent,
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::models::{
    CapturePayload, CheckoutContext, Resolution, Stage, StepUpChallenge, StepUpState,
};
use crate::orchestrator::{EnrollmentOutcome, StepUpOrchestrator};
use crate::request::CheckoutRequest;

/// Turns flow outcomes into whatever the surrounding framework sends back.
pub trait Responder: Send + Sync {
    type Response;

    /// Hand the browser to the ACS.
    fn render_step_up(&self, challenge: &StepUpChallenge) -> Self::Response;

    /// Continue checkout towards payment capture.
    fn proceed(&self, payload: CapturePayload) -> Self::Response;

    /// Abort checkout and send the shopper back to order review.
    fn abort(&self, stage: Stage, error: &AuthenticationError) -> Self::Response;

    /// Cart is not ready for payment; start checkout over.
    fn restart_checkout(&self, cart_id: &str) -> Self::Response;
}

pub struct CheckoutFlow<R> {
    orchestrator: Arc<StepUpOrchestrator>,
    responder: R,
    enabled: bool,
}

impl<R: Responder> CheckoutFlow<R> {
    pub fn new(orchestrator: Arc<StepUpOrchestrator>, responder: R, enabled: bool) -> Self {
        Self {
            orchestrator,
            responder,
            enabled,
        }
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    pub async fn handle(
        &self,
        cart: &CheckoutContext,
        controller_url: &Url,
        request: CheckoutRequest,
    ) -> R::Response {
        if !self.is_ready(cart) {
            info!("Cart {} is not ready for payment, restarting checkout", cart.cart_id);
            return self.responder.restart_checkout(&cart.cart_id);
        }

        debug!("Cart {}: handling {} request", cart.cart_id, request.kind());
        let from = request.entry_state();

        match request {
            CheckoutRequest::Passthrough => self
                .responder
                .proceed(CapturePayload::new(cart, Resolution::Passthrough)),
            CheckoutRequest::EnrollmentCheck {
                session_id,
                session_version,
            } => {
                let session = AuthenticationSession {
                    session_id: session_id.unwrap_or_default(),
                    session_version,
                    order_amount: cart.order_total,
                    currency: cart.currency.clone(),
                    return_url: controller_url.clone(),
                };
                self.enroll(cart, from, &session).await
            }
            CheckoutRequest::StepUpResult {
                authentication_id,
                result,
                session_id,
                session_version,
            } => {
                debug!(
                    "Cart {}: step-up result for session {} (version {})",
                    cart.cart_id,
                    session_id.as_deref().unwrap_or("-"),
                    session_version.as_deref().unwrap_or("-")
                );
                let correlation = SessionRef {
                    session_id,
                    session_version,
                };
                self.verify(
                    cart,
                    from,
                    authentication_id.as_deref(),
                    correlation,
                    &result,
                )
                .await
            }
        }
    }

    fn is_ready(&self, cart: &CheckoutContext) -> bool {
        self.enabled
            && cart.has_customer()
            && cart.delivery_address.is_some()
            && cart.invoice_address.is_some()
    }

    async fn enroll(
        &self,
        cart: &CheckoutContext,
        from: StepUpState,
        session: &AuthenticationSession,
    ) -> R::Response {
        let outcome = match self.orchestrator.check_enrollment(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                transition(cart, from, StepUpState::aborted());
                return self.abort(cart, Stage::Enrollment, e);
            }
        };
        transition(cart, from, outcome.state());

        let result = outcome.result();
        publish(CheckoutEvent::EnrollmentChecked(EnrollmentCheckedEvent {
            request_id: Uuid::new_v4(),
            cart_id: cart.cart_id.clone(),
            authentication_id: result.authentication_id.clone(),
            recommendation: result.recommendation.to_string(),
            step_up_required: result.requires_step_up(),
            timestamp: CheckoutEvent::now(),
        }));

        match outcome {
            EnrollmentOutcome::StepUpRequired(challenge) => {
                self.responder.render_step_up(&challenge)
            }
            EnrollmentOutcome::NotRequired(_) => self
                .responder
                .proceed(CapturePayload::new(cart, Resolution::NotEnrolled)),
        }
    }

    async fn verify(
        &self,
        cart: &CheckoutContext,
        from: StepUpState,
        authentication_id: Option<&str>,
        session: SessionRef,
        step_up: &StepUpResult,
    ) -> R::Response {
        let outcome = self.orchestrator.verify_step_up(authentication_id, step_up).await;
        transition(cart, from, StepUpState::after_verification(&outcome));

        let verified = match outcome {
            Ok(verified) => verified,
            Err(e) => return self.abort(cart, Stage::Verification, e),
        };

        // verify_step_up only succeeds with a non-blank id.
        let authentication_id = authentication_id.unwrap_or_default().trim().to_string();

        publish(CheckoutEvent::StepUpVerified(verified_event(
            cart,
            &authentication_id,
            session,
            &verified,
        )));

        self.responder.proceed(CapturePayload::new(
            cart,
            Resolution::Verified {
                authentication_id,
                three_ds: verified,
            },
        ))
    }

    fn abort(&self, cart: &CheckoutContext, stage: Stage, e: AuthenticationError) -> R::Response {
        match &e {
            AuthenticationError::GatewayUnavailable(cause) => error!(
                "Cart {}: gateway unavailable during {}: {}",
                cart.cart_id,
                stage.as_str(),
                cause
            ),
            _ => warn!("Cart {}: {} aborted: {}", cart.cart_id, stage.as_str(), e),
        }

        publish(CheckoutEvent::CheckoutAborted(CheckoutAbortedEvent {
            request_id: Uuid::new_v4(),
            cart_id: cart.cart_id.clone(),
            kind: e.kind().to_string(),
            reason: e.user_message().to_string(),
            timestamp: CheckoutEvent::now(),
        }));

        self.responder.abort(stage, &e)
    }
}

/// Gateway session the ACS post-back refers to, as round-tripped through the
/// return URL.
struct SessionRef {
    session_id: Option<String>,
    session_version: Option<String>,
}

fn verified_event(
    cart: &CheckoutContext,
    authentication_id: &str,
    session: SessionRef,
    verified: &VerificationResult,
) -> StepUpVerifiedEvent {
    StepUpVerifiedEvent {
        request_id: Uuid::new_v4(),
        cart_id: cart.cart_id.clone(),
        authentication_id: authentication_id.to_string(),
        session_id: session.session_id,
        session_version: session.session_version,
        eci: verified.eci.clone(),
        enrollment_status: verified.enrollment_status.clone(),
        timestamp: CheckoutEvent::now(),
    }
}

fn transition(cart: &CheckoutContext, from: StepUpState, to: StepUpState) {
    debug!("Cart {}: step-up {:?} -> {:?}", cart.cart_id, from, to);
}

fn publish(event: CheckoutEvent) {
    match serde_json::to_string(&event) {
        Ok(payload) => info!(target: "stepup::events", cart_id = event.cart_id(), "{}", payload),
        Err(e) => error!("Failed to serialize checkout event: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use stepup_core::{Address, Contact, CurrencyCode, GatewayError};
    use stepup_shared::Masked;

    #[derive(Debug)]
    enum Sent {
        StepUp { authentication_id: String, return_url: Url },
        Proceed(CapturePayload),
        Abort { stage: Stage, kind: &'static str, message: &'static str },
        Restart(String),
    }

    struct Recording;

    impl Responder for Recording {
        type Response = Sent;

        fn render_step_up(&self, challenge: &StepUpChallenge) -> Sent {
            Sent::StepUp {
                authentication_id: challenge.authentication_id().to_string(),
                return_url: challenge.return_url.clone(),
            }
        }

        fn proceed(&self, payload: CapturePayload) -> Sent {
            Sent::Proceed(payload)
        }

        fn abort(&self, stage: Stage, error: &AuthenticationError) -> Sent {
            Sent::Abort {
                stage,
                kind: error.kind(),
                message: error.user_message(),
            }
        }

        fn restart_checkout(&self, cart_id: &str) -> Sent {
            Sent::Restart(cart_id.to_string())
        }
    }

    fn cart() -> CheckoutContext {
        let address = Address {
            address1: "1 Infinite Loop".to_string(),
            city: "Cupertino".to_string(),
            postcode: "95014".to_string(),
            country_iso2: "US".to_string(),
            firstname: "Grace".to_string(),
            lastname: "Hopper".to_string(),
            ..Default::default()
        };
        CheckoutContext {
            cart_id: "7".to_string(),
            customer_id: Some(3),
            customer: Some(Contact::from(&address)),
            delivery_address: Some(address.clone()),
            invoice_address: Some(address),
            order_total: dec!(100.00),
            currency: CurrencyCode::parse("USD").unwrap(),
        }
    }

    fn controller() -> Url {
        Url::parse("https://shop.example/checkout/7/payment").unwrap()
    }

    fn flow(gateway: &Arc<ScriptedGateway>, enabled: bool) -> CheckoutFlow<Recording> {
        let orchestrator = StepUpOrchestrator::new(gateway.clone(), Duration::from_secs(5));
        CheckoutFlow::new(Arc::new(orchestrator), Recording, enabled)
    }

    fn enrollment() -> CheckoutRequest {
        CheckoutRequest::EnrollmentCheck {
            session_id: Some("SESSION0002".to_string()),
            session_version: Some("e3f144ce02".to_string()),
        }
    }

    fn post_back(id: Option<&str>, pa_res: Option<&str>) -> CheckoutRequest {
        CheckoutRequest::StepUpResult {
            authentication_id: id.map(str::to_string),
            result: StepUpResult {
                authentication_id: id.map(str::to_string),
                payer_authentication_response: pa_res.map(|p| Masked::new(p.to_string())),
            },
            session_id: Some("SESSION0002".to_string()),
            session_version: Some("e3f144ce02".to_string()),
        }
    }

    #[tokio::test]
    async fn test_enrollment_renders_step_up() {
        let gateway = Arc::new(ScriptedGateway::step_up_required("3DS-abc"));
        let sent = flow(&gateway, true).handle(&cart(), &controller(), enrollment()).await;

        match sent {
            Sent::StepUp { authentication_id, return_url } => {
                assert_eq!(authentication_id, "3DS-abc");
                assert!(return_url.as_str().contains("process_acs_result=1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gateway.enrollments()[0].amount, dec!(100.00));
    }

    #[tokio::test]
    async fn test_not_enrolled_proceeds() {
        let gateway = Arc::new(ScriptedGateway::not_enrolled());
        let sent = flow(&gateway, true).handle(&cart(), &controller(), enrollment()).await;

        match sent {
            Sent::Proceed(payload) => assert_eq!(payload.resolution, Resolution::NotEnrolled),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_enrollment_decline_aborts() {
        let gateway = Arc::new(ScriptedGateway::enrollment_declined("DO_NOT_PROCEED"));
        let sent = flow(&gateway, true).handle(&cart(), &controller(), enrollment()).await;

        match sent {
            Sent::Abort { stage, kind, message } => {
                assert_eq!(stage, Stage::Enrollment);
                assert_eq!(kind, "gateway_declined");
                assert_eq!(message, "Your payment was declined.");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verified_step_up_proceeds_with_proof() {
        let gateway = Arc::new(ScriptedGateway::verified());
        let sent = flow(&gateway, true)
            .handle(&cart(), &controller(), post_back(Some("3DS-abc"), Some("eJxVUttu2zAM")))
            .await;

        match sent {
            Sent::Proceed(payload) => match payload.resolution {
                Resolution::Verified { authentication_id, three_ds } => {
                    assert_eq!(authentication_id, "3DS-abc");
                    assert!(three_ds.recommendation.is_proceed());
                    assert_eq!(three_ds.eci.as_deref(), Some("05"));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_id_aborts_without_gateway_call() {
        let gateway = Arc::new(ScriptedGateway::verified());
        let sent = flow(&gateway, true)
            .handle(&cart(), &controller(), post_back(None, Some("eJxVUttu2zAM")))
            .await;

        match sent {
            Sent::Abort { stage, kind, message } => {
                assert_eq!(stage, Stage::Verification);
                assert_eq!(kind, "missing_authentication_data");
                assert_eq!(message, "Payment error occurred (3D Secure).");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_outage_aborts_with_generic_message() {
        let gateway = Arc::new(ScriptedGateway::failing(GatewayError::Rejected {
            status: 503,
            cause: "SERVER_BUSY".to_string(),
            explanation: "try later".to_string(),
        }));
        let sent = flow(&gateway, true)
            .handle(&cart(), &controller(), post_back(Some("3DS-abc"), Some("blob")))
            .await;

        match sent {
            Sent::Abort { kind, message, .. } => {
                assert_eq!(kind, "gateway_unavailable");
                assert_eq!(message, "Payment error occurred (3D Secure).");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unready_cart_restarts_checkout() {
        let gateway = Arc::new(ScriptedGateway::step_up_required("3DS-abc"));

        let mut no_invoice = cart();
        no_invoice.invoice_address = None;
        let mut guest = cart();
        guest.customer_id = Some(0);

        for c in [no_invoice, guest] {
            let sent = flow(&gateway, true).handle(&c, &controller(), enrollment()).await;
            assert!(matches!(sent, Sent::Restart(ref id) if id == "7"));
        }

        let sent = flow(&gateway, false).handle(&cart(), &controller(), enrollment()).await;
        assert!(matches!(sent, Sent::Restart(_)));
        assert_eq!(gateway.call_count(), 0);
    }

    #[test]
    fn test_verified_event_carries_session() {
        let verified = VerificationResult {
            recommendation: stepup_core::Recommendation::Proceed,
            eci: Some("05".to_string()),
            authentication_token: None,
            payer_authentication_response_status: Some("Y".to_string()),
            enrollment_status: Some("Y".to_string()),
            transaction_id: None,
        };
        let session = SessionRef {
            session_id: Some("SESSION0002".to_string()),
            session_version: Some("e3f144ce02".to_string()),
        };

        let event = verified_event(&cart(), "3DS-abc", session, &verified);
        assert_eq!(event.cart_id, "7");
        assert_eq!(event.authentication_id, "3DS-abc");
        assert_eq!(event.session_id.as_deref(), Some("SESSION0002"));
        assert_eq!(event.session_version.as_deref(), Some("e3f144ce02"));
        assert_eq!(event.eci.as_deref(), Some("05"));

        let value = serde_json::to_value(CheckoutEvent::StepUpVerified(event)).unwrap();
        assert_eq!(value["type"], "step_up_verified");
        assert_eq!(value["session_id"], "SESSION0002");
    }

    #[tokio::test]
    async fn test_passthrough_proceeds_untouched() {
        let gateway = Arc::new(ScriptedGateway::verified());
        let sent = flow(&gateway, true)
            .handle(&cart(), &controller(), CheckoutRequest::Passthrough)
            .await;

        assert!(matches!(sent, Sent::Proceed(ref p) if p.resolution == Resolution::Passthrough));
        assert_eq!(gateway.call_count(), 0);
    }
}
