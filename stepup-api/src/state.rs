use std::sync::Arc;
use stepup_checkout::{CartProvider, CheckoutFlow};
use url::Url;

use crate::metrics::Metrics;
use crate::responder::HttpResponder;

#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<dyn CartProvider>,
    pub flow: Arc<CheckoutFlow<HttpResponder>>,
    pub metrics: Arc<Metrics>,
    /// Origin the shopper's browser sees; controller URLs are built from it.
    pub public_base_url: Url,
}
