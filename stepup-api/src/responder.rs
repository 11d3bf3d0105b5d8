use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use maud::{html, Markup, DOCTYPE};
use std::sync::Arc;
use stepup_checkout::{CapturePayload, Resolution, Responder, Stage, StepUpChallenge};
use stepup_core::{AuthenticationError, RedirectForm};
use url::Url;

use crate::metrics::Metrics;

/// ACS form field carrying the return URL.
pub const TERM_URL: &str = "TermUrl";
/// ACS form field echoed back as the authentication id.
pub const MERCHANT_DATA: &str = "MD";

/// Answers checkout requests over HTTP and counts outcomes.
pub struct HttpResponder {
    review_url: Url,
    start_url: Url,
    metrics: Arc<Metrics>,
}

impl HttpResponder {
    pub fn new(review_url: Url, start_url: Url, metrics: Arc<Metrics>) -> Self {
        Self {
            review_url,
            start_url,
            metrics,
        }
    }

    fn redirect(url: &Url) -> Response {
        Redirect::to(url.as_str()).into_response()
    }
}

impl Responder for HttpResponder {
    type Response = Response;

    fn render_step_up(&self, challenge: &StepUpChallenge) -> Response {
        self.metrics
            .enrollment_checks
            .with_label_values(&["step_up_required"])
            .inc();

        match challenge.redirect_form() {
            Some(form) => {
                let page = acs_page(form, &challenge.return_url, challenge.authentication_id());
                (
                    [(header::CACHE_CONTROL, "no-store")],
                    Html(page.into_string()),
                )
                    .into_response()
            }
            // EnrollmentOutcome::StepUpRequired always carries a form.
            None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    fn proceed(&self, payload: CapturePayload) -> Response {
        match &payload.resolution {
            Resolution::NotEnrolled => self
                .metrics
                .enrollment_checks
                .with_label_values(&["not_enrolled"])
                .inc(),
            Resolution::Verified { .. } => self
                .metrics
                .verifications
                .with_label_values(&["proceed"])
                .inc(),
            Resolution::Passthrough => {}
        }

        (StatusCode::OK, Json(payload)).into_response()
    }

    fn abort(&self, stage: Stage, error: &AuthenticationError) -> Response {
        let counter = match stage {
            Stage::Enrollment => &self.metrics.enrollment_checks,
            Stage::Verification => &self.metrics.verifications,
        };
        counter.with_label_values(&[error.kind()]).inc();

        if let AuthenticationError::GatewayUnavailable(_) = error {
            self.metrics
                .gateway_unavailable
                .with_label_values(&[stage.as_str()])
                .inc();
        }

        let mut url = self.review_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "show")
            .append_pair("notification", error.user_message());
        Self::redirect(&url)
    }

    fn restart_checkout(&self, _cart_id: &str) -> Response {
        let mut url = self.start_url.clone();
        url.query_pairs_mut().append_pair("step", "1");
        Self::redirect(&url)
    }
}

/// Auto-submitting page that posts the cardholder to the issuer's ACS.
pub fn acs_page(form: &RedirectForm, return_url: &Url, authentication_id: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "3-D Secure" }
            }
            body onload="document.getElementById('acs_form').submit();" {
                form #acs_form action=(form.endpoint.as_str()) method=(form.method.to_string()) {
                    @for (name, value) in &form.fields {
                        input type="hidden" name=(name) value=(value);
                    }
                    input type="hidden" name=(TERM_URL) value=(return_url.as_str());
                    input type="hidden" name=(MERCHANT_DATA) value=(authentication_id);
                    noscript {
                        p { "JavaScript is disabled. Press the button to continue to your bank." }
                        button type="submit" { "Continue" }
                    }
                }
            }
        }
    }
}
