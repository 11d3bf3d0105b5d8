pub mod cart;
pub mod flow;
pub mod models;
pub mod orchestrator;
pub mod request;
pub mod return_url;

#[cfg(test)]
mod testing;

pub use cart::{CartError, CartProvider, InMemoryCarts};
pub use flow::{CheckoutFlow, Responder};
pub use models::{CapturePayload, CheckoutContext, Resolution, Stage, StepUpChallenge, StepUpState};
pub use orchestrator::{EnrollmentOutcome, StepUpOrchestrator};
pub use request::CheckoutRequest;
pub use return_url::ReturnUrlBuilder;
