pub mod events;

pub use events::{CheckoutAbortedEvent, CheckoutEvent, EnrollmentCheckedEvent, StepUpVerifiedEvent};
