use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stepup_core::address::{address_for_gateway, contact_for_gateway};
use stepup_core::{
    Address, AuthenticationError, Contact, CurrencyCode, EnrollmentCheckResult, GatewayAddress,
    GatewayContact, RedirectForm, VerificationResult,
};
use url::Url;

/// Read-only snapshot of the shopper's cart, supplied by the cart collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutContext {
    pub cart_id: String,
    /// Zero or missing means the shopper never got past the login step.
    pub customer_id: Option<u64>,
    pub customer: Option<Contact>,
    pub delivery_address: Option<Address>,
    pub invoice_address: Option<Address>,
    pub order_total: Decimal,
    pub currency: CurrencyCode,
}

impl CheckoutContext {
    pub fn has_customer(&self) -> bool {
        self.customer_id.is_some_and(|id| id != 0) && self.customer.is_some()
    }
}

/// Where the handshake stands for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUpState {
    Init,
    AwaitingStepUp,
    Resolved(Decision),
}

impl StepUpState {
    /// Any failed stage aborts checkout.
    pub fn aborted() -> Self {
        StepUpState::Resolved(Decision::Declined)
    }

    /// State after the ACS post-back was checked with the gateway. Only a
    /// verified proceed lets checkout continue.
    pub fn after_verification<T>(outcome: &Result<T, AuthenticationError>) -> Self {
        match outcome {
            Ok(_) => StepUpState::Resolved(Decision::Proceed),
            Err(_) => StepUpState::aborted(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    Declined,
}

/// Which half of the handshake produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enrollment,
    Verification,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Enrollment => "enrollment",
            Stage::Verification => "verification",
        }
    }
}

/// Everything the browser needs to hand control to the ACS.
#[derive(Debug, Clone)]
pub struct StepUpChallenge {
    pub result: EnrollmentCheckResult,
    /// Controller URL carrying the correlation ids back from the ACS.
    pub return_url: Url,
}

impl StepUpChallenge {
    pub fn authentication_id(&self) -> &str {
        self.result.authentication_id.as_deref().unwrap_or_default()
    }

    pub fn redirect_form(&self) -> Option<&RedirectForm> {
        self.result.redirect_form.as_ref()
    }
}

/// How the request reached the "continue checkout" branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// No 3DS interaction was requested.
    Passthrough,
    /// Enrollment check passed and the card needs no step-up.
    NotEnrolled,
    /// Step-up completed and the gateway recommends proceeding.
    Verified {
        authentication_id: String,
        #[serde(rename = "threeDSecure")]
        three_ds: VerificationResult,
    },
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Passthrough => "passthrough",
            Resolution::NotEnrolled => "not_enrolled",
            Resolution::Verified { .. } => "verified",
        }
    }
}

/// Handed to the payment capture step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePayload {
    pub cart_id: String,
    #[serde(flatten)]
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<GatewayAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<GatewayAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<GatewayContact>,
}

impl CapturePayload {
    pub fn new(cart: &CheckoutContext, resolution: Resolution) -> Self {
        Self {
            cart_id: cart.cart_id.clone(),
            resolution,
            billing: cart.invoice_address.as_ref().map(address_for_gateway),
            shipping: cart.delivery_address.as_ref().map(address_for_gateway),
            customer: cart.customer.as_ref().map(contact_for_gateway),
        }
    }
}
