use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted after the gateway answered an enrollment check.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnrollmentCheckedEvent {
    pub request_id: Uuid,
    pub cart_id: String,
    pub authentication_id: Option<String>,
    pub recommendation: String,
    pub step_up_required: bool,
    pub timestamp: i64,
}

/// Emitted after a step-up result was verified and the checkout may continue.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StepUpVerifiedEvent {
    pub request_id: Uuid,
    pub cart_id: String,
    pub authentication_id: String,
    /// Gateway session the post-back was correlated with.
    pub session_id: Option<String>,
    pub session_version: Option<String>,
    pub eci: Option<String>,
    pub enrollment_status: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckoutAbortedEvent {
    pub request_id: Uuid,
    pub cart_id: String,
    pub kind: String,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    EnrollmentChecked(EnrollmentCheckedEvent),
    StepUpVerified(StepUpVerifiedEvent),
    CheckoutAborted(CheckoutAbortedEvent),
}

impl CheckoutEvent {
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    pub fn cart_id(&self) -> &str {
        match self {
            CheckoutEvent::EnrollmentChecked(e) => &e.cart_id,
            CheckoutEvent::StepUpVerified(e) => &e.cart_id,
            CheckoutEvent::CheckoutAborted(e) => &e.cart_id,
        }
    }
}
