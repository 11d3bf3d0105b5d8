use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use stepup_core::gateway::{
    AcsResultResponse, AcsResultThreeDs, AuthenticationRedirect, CustomizedRedirect,
    EnrollmentResponse, EnrollmentThreeDs, GatewayClient, GatewaySession, GatewayVerdict,
    OrderTotals, ThreeDsConfig,
};
use stepup_core::{GatewayError, Recommendation};
use stepup_shared::Masked;
use url::Url;
use uuid::Uuid;

/// Session ids starting with this are declined at enrollment.
pub const DECLINE_SESSION_PREFIX: &str = "DECLINE";
/// Session ids starting with this are not enrolled (no step-up).
pub const FRICTIONLESS_SESSION_PREFIX: &str = "FRICTIONLESS";
/// A `PaRes` with this value fails verification.
pub const DECLINED_PA_RES: &str = "DECLINE";

/// In-process gateway that answers from the session id and `PaRes` alone.
///
/// Used for local runs without MPGS credentials. Counts calls so callers can
/// check that a request never reached the gateway.
pub struct SandboxGateway {
    acs_url: Url,
    enrollment_calls: AtomicUsize,
    acs_result_calls: AtomicUsize,
}

impl SandboxGateway {
    pub fn new(acs_url: Url) -> Self {
        Self {
            acs_url,
            enrollment_calls: AtomicUsize::new(0),
            acs_result_calls: AtomicUsize::new(0),
        }
    }

    pub fn enrollment_calls(&self) -> usize {
        self.enrollment_calls.load(Ordering::SeqCst)
    }

    pub fn acs_result_calls(&self) -> usize {
        self.acs_result_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayClient for SandboxGateway {
    async fn check_3ds_enrollment(
        &self,
        _three_ds: &ThreeDsConfig,
        order: &OrderTotals,
        session: &GatewaySession,
    ) -> Result<EnrollmentResponse, GatewayError> {
        self.enrollment_calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "Sandbox enrollment check for session {} ({} {})",
            session.id,
            order.amount,
            order.currency
        );

        let three_ds_id = format!("3DS-{}", Uuid::new_v4().simple());

        if session.id.starts_with(DECLINE_SESSION_PREFIX) {
            return Ok(EnrollmentResponse {
                three_ds_id: Some(three_ds_id),
                three_ds: None,
                response: GatewayVerdict {
                    gateway_recommendation: Recommendation::DoNotProceed,
                },
            });
        }

        let three_ds = if session.id.starts_with(FRICTIONLESS_SESSION_PREFIX) {
            EnrollmentThreeDs {
                summary_status: Some("CARD_NOT_ENROLLED".to_string()),
                ve_res_enrolled: Some("N".to_string()),
                ..Default::default()
            }
        } else {
            EnrollmentThreeDs {
                authentication_redirect: Some(AuthenticationRedirect {
                    customized: Some(CustomizedRedirect {
                        acs_url: self.acs_url.clone(),
                        pa_req: format!("SANDBOX-PAREQ-{}", session.id),
                    }),
                    simple: None,
                }),
                summary_status: Some("CARD_ENROLLED".to_string()),
                ve_res_enrolled: Some("Y".to_string()),
                xid: Some(Uuid::new_v4().simple().to_string()),
            }
        };

        Ok(EnrollmentResponse {
            three_ds_id: Some(three_ds_id),
            three_ds: Some(three_ds),
            response: GatewayVerdict {
                gateway_recommendation: Recommendation::Proceed,
            },
        })
    }

    async fn process_acs_result(
        &self,
        authentication_id: &str,
        pa_res: &Masked<String>,
    ) -> Result<AcsResultResponse, GatewayError> {
        self.acs_result_calls.fetch_add(1, Ordering::SeqCst);

        if pa_res.expose() == DECLINED_PA_RES {
            return Ok(AcsResultResponse {
                three_ds_id: Some(authentication_id.to_string()),
                three_ds: Some(AcsResultThreeDs {
                    pa_res_status: Some("N".to_string()),
                    ve_res_enrolled: Some("Y".to_string()),
                    ..Default::default()
                }),
                response: GatewayVerdict {
                    gateway_recommendation: Recommendation::DoNotProceed,
                },
            });
        }

        Ok(AcsResultResponse {
            three_ds_id: Some(authentication_id.to_string()),
            three_ds: Some(AcsResultThreeDs {
                acs_eci: Some("05".to_string()),
                authentication_token: Some(Masked::new(format!(
                    "SANDBOX-CAVV-{}",
                    authentication_id
                ))),
                pa_res_status: Some("Y".to_string()),
                ve_res_enrolled: Some("Y".to_string()),
                xid: Some(Uuid::new_v4().simple().to_string()),
            }),
            response: GatewayVerdict {
                gateway_recommendation: Recommendation::Proceed,
            },
        })
    }
}
