//! Recording gateway double shared by the unit tests in this crate.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;
use stepup_core::gateway::{
    AcsResultResponse, AcsResultThreeDs, AuthenticationRedirect, CustomizedRedirect,
    EnrollmentResponse, EnrollmentThreeDs, GatewayClient, GatewaySession, GatewayVerdict,
    OrderTotals, ThreeDsConfig,
};
use stepup_core::{GatewayError, Recommendation, RedirectForm};
use stepup_shared::Masked;
use url::Url;

const ACS_URL: &str = "https://acs.issuer.example/challenge";
const PA_REQ: &str = "eAFVUe1ugjAU";

#[derive(Debug, Clone)]
pub struct RecordedEnrollment {
    pub amount: Decimal,
    pub currency: String,
    pub session_id: String,
    pub response_url: String,
}

enum Script {
    StepUp { authentication_id: Option<String> },
    NotEnrolled,
    EnrollmentDeclined(String),
    Verified,
    VerificationDeclined,
    Failing,
    Hanging,
}

pub struct ScriptedGateway {
    script: Script,
    failure: Mutex<Option<GatewayError>>,
    enrollments: Mutex<Vec<RecordedEnrollment>>,
    acs_results: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    fn scripted(script: Script) -> Self {
        Self {
            script,
            failure: Mutex::new(None),
            enrollments: Mutex::new(Vec::new()),
            acs_results: Mutex::new(Vec::new()),
        }
    }

    pub fn step_up_required(authentication_id: &str) -> Self {
        Self::scripted(Script::StepUp {
            authentication_id: Some(authentication_id.to_string()),
        })
    }

    pub fn step_up_without_id() -> Self {
        Self::scripted(Script::StepUp { authentication_id: None })
    }

    pub fn not_enrolled() -> Self {
        Self::scripted(Script::NotEnrolled)
    }

    pub fn enrollment_declined(code: &str) -> Self {
        Self::scripted(Script::EnrollmentDeclined(code.to_string()))
    }

    pub fn verified() -> Self {
        Self::scripted(Script::Verified)
    }

    pub fn verification_declined() -> Self {
        Self::scripted(Script::VerificationDeclined)
    }

    /// Fails the first call with `error`; later calls fail with a transport error.
    pub fn failing(error: GatewayError) -> Self {
        let gateway = Self::scripted(Script::Failing);
        *gateway.failure.lock().unwrap() = Some(error);
        gateway
    }

    pub fn hanging() -> Self {
        Self::scripted(Script::Hanging)
    }

    pub fn redirect_form(&self) -> RedirectForm {
        RedirectForm::from(&customized())
    }

    pub fn acs_three_ds(&self) -> AcsResultThreeDs {
        AcsResultThreeDs {
            acs_eci: Some("05".to_string()),
            authentication_token: Some(Masked::new("gIGCg4SFhoeIiYqLjI2Ojw==".to_string())),
            pa_res_status: Some("Y".to_string()),
            ve_res_enrolled: Some("Y".to_string()),
            xid: Some("pBzJJ4Hmw3MiUcpHOtvB4bg=".to_string()),
        }
    }

    pub fn enrollments(&self) -> Vec<RecordedEnrollment> {
        self.enrollments.lock().unwrap().clone()
    }

    pub fn acs_results(&self) -> Vec<(String, String)> {
        self.acs_results.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.enrollments.lock().unwrap().len() + self.acs_results.lock().unwrap().len()
    }

    async fn interrupt(&self) -> Option<GatewayError> {
        match self.script {
            Script::Failing => Some(
                self.failure
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or_else(|| GatewayError::Transport("scripted failure".to_string())),
            ),
            Script::Hanging => {
                std::future::pending::<()>().await;
                None
            }
            _ => None,
        }
    }
}

fn customized() -> CustomizedRedirect {
    CustomizedRedirect {
        acs_url: Url::parse(ACS_URL).unwrap(),
        pa_req: PA_REQ.to_string(),
    }
}

fn verdict(recommendation: Recommendation) -> GatewayVerdict {
    GatewayVerdict {
        gateway_recommendation: recommendation,
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn check_3ds_enrollment(
        &self,
        three_ds: &ThreeDsConfig,
        order: &OrderTotals,
        session: &GatewaySession,
    ) -> Result<EnrollmentResponse, GatewayError> {
        self.enrollments.lock().unwrap().push(RecordedEnrollment {
            amount: order.amount,
            currency: order.currency.to_string(),
            session_id: session.id.clone(),
            response_url: three_ds.authentication_redirect.response_url.to_string(),
        });

        if let Some(err) = self.interrupt().await {
            return Err(err);
        }

        let response = match &self.script {
            Script::StepUp { authentication_id } => EnrollmentResponse {
                three_ds_id: authentication_id.clone(),
                three_ds: Some(EnrollmentThreeDs {
                    authentication_redirect: Some(AuthenticationRedirect {
                        customized: Some(customized()),
                        simple: None,
                    }),
                    ve_res_enrolled: Some("Y".to_string()),
                    summary_status: Some("CARD_ENROLLED".to_string()),
                    xid: None,
                }),
                response: verdict(Recommendation::Proceed),
            },
            Script::EnrollmentDeclined(code) => EnrollmentResponse {
                three_ds_id: Some("3DS-declined".to_string()),
                three_ds: None,
                response: verdict(Recommendation::from(code.clone())),
            },
            _ => EnrollmentResponse {
                three_ds_id: Some("3DS-frictionless".to_string()),
                three_ds: Some(EnrollmentThreeDs {
                    ve_res_enrolled: Some("N".to_string()),
                    summary_status: Some("CARD_NOT_ENROLLED".to_string()),
                    ..Default::default()
                }),
                response: verdict(Recommendation::Proceed),
            },
        };
        Ok(response)
    }

    async fn process_acs_result(
        &self,
        authentication_id: &str,
        pa_res: &Masked<String>,
    ) -> Result<AcsResultResponse, GatewayError> {
        self.acs_results
            .lock()
            .unwrap()
            .push((authentication_id.to_string(), pa_res.expose().clone()));

        if let Some(err) = self.interrupt().await {
            return Err(err);
        }

        let response = match self.script {
            Script::VerificationDeclined => AcsResultResponse {
                three_ds_id: Some(authentication_id.to_string()),
                three_ds: Some(AcsResultThreeDs {
                    pa_res_status: Some("N".to_string()),
                    ..Default::default()
                }),
                response: verdict(Recommendation::DoNotProceed),
            },
            _ => AcsResultResponse {
                three_ds_id: Some(authentication_id.to_string()),
                three_ds: Some(self.acs_three_ds()),
                response: verdict(Recommendation::Proceed),
            },
        };
        Ok(response)
    }
}
