use std::collections::HashMap;
use stepup_core::StepUpResult;
use stepup_shared::Masked;

use crate::models::StepUpState;

pub const CHECK_3DS_ENROLLMENT: &str = "check_3ds_enrollment";
pub const PROCESS_ACS_RESULT: &str = "process_acs_result";
pub const THREE_DS_ID: &str = "3DSecureId";
pub const SESSION_ID: &str = "session_id";
pub const SESSION_VERSION: &str = "session_version";
pub const PA_RES: &str = "PaRes";
pub const MD: &str = "MD";

/// The three shapes a checkout controller request can take.
#[derive(Debug, Clone)]
pub enum CheckoutRequest {
    EnrollmentCheck {
        session_id: Option<String>,
        session_version: Option<String>,
    },
    StepUpResult {
        /// Id round-tripped through the return URL.
        authentication_id: Option<String>,
        result: StepUpResult,
        session_id: Option<String>,
        session_version: Option<String>,
    },
    Passthrough,
}

impl CheckoutRequest {
    /// Classify a request from its query string and (for the ACS post-back)
    /// its form body. A step-up result wins over an enrollment flag.
    pub fn from_params(query: &HashMap<String, String>, form: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| -> Option<String> {
            form.get(key)
                .or_else(|| query.get(key))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let flag = |key: &str| lookup(key).as_deref() == Some("1");

        if flag(PROCESS_ACS_RESULT) {
            let authentication_id = query
                .get(THREE_DS_ID)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            return CheckoutRequest::StepUpResult {
                authentication_id,
                result: StepUpResult {
                    authentication_id: lookup(MD),
                    payer_authentication_response: lookup(PA_RES).map(Masked::new),
                },
                session_id: lookup(SESSION_ID),
                session_version: lookup(SESSION_VERSION),
            };
        }

        if flag(CHECK_3DS_ENROLLMENT) {
            return CheckoutRequest::EnrollmentCheck {
                session_id: lookup(SESSION_ID),
                session_version: lookup(SESSION_VERSION),
            };
        }

        CheckoutRequest::Passthrough
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutRequest::EnrollmentCheck { .. } => "enrollment_check",
            CheckoutRequest::StepUpResult { .. } => "step_up_result",
            CheckoutRequest::Passthrough => "passthrough",
        }
    }

    /// Where the handshake stands when this request arrives. An ACS post-back
    /// resumes a step-up that an earlier enrollment check started.
    pub fn entry_state(&self) -> StepUpState {
        match self {
            CheckoutRequest::StepUpResult { .. } => StepUpState::AwaitingStepUp,
            CheckoutRequest::EnrollmentCheck { .. } | CheckoutRequest::Passthrough => {
                StepUpState::Init
            }
        }
    }
}
