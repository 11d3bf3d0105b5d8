use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Form, Router,
};
use std::collections::HashMap;
use stepup_checkout::CheckoutRequest;
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/checkout/{cart_id}/payment",
        get(payment_get).post(payment_post),
    )
}

/// Enrollment checks and plain checkout continuation arrive as GET.
pub async fn payment_get(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    handle(state, cart_id, query, HashMap::new()).await
}

/// The ACS posts `PaRes` and `MD` back as a form.
pub async fn payment_post(
    State(state): State<AppState>,
    Path(cart_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    handle(state, cart_id, query, form).await
}

async fn handle(
    state: AppState,
    cart_id: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
) -> Result<Response, AppError> {
    let cart = state
        .carts
        .load(&cart_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("Cart {} not found", cart_id)))?;

    let controller_url = controller_url(&state.public_base_url, &cart_id)?;
    let request = CheckoutRequest::from_params(&query, &form);

    Ok(state.flow.handle(&cart, &controller_url, request).await)
}

/// Public URL of the payment controller for one cart.
pub fn controller_url(base: &Url, cart_id: &str) -> Result<Url, AppError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| {
            AppError::InternalServerError(format!("{} cannot be used as a base url", base))
        })?
        .pop_if_empty()
        .extend(["checkout", cart_id, "payment"]);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_url() {
        let base = Url::parse("https://shop.example/").unwrap();
        assert_eq!(
            controller_url(&base, "42").unwrap().as_str(),
            "https://shop.example/checkout/42/payment"
        );

        let base = Url::parse("https://shop.example/store").unwrap();
        assert_eq!(
            controller_url(&base, "a/b").unwrap().as_str(),
            "https://shop.example/store/checkout/a%2Fb/payment"
        );
    }
}
