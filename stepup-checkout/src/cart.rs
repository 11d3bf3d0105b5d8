use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::CheckoutContext;

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Cart store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the shopper's cart.
#[async_trait]
pub trait CartProvider: Send + Sync {
    async fn load(&self, cart_id: &str) -> Result<Option<CheckoutContext>, CartError>;
}

/// Keeps carts in memory, keyed by cart id.
#[derive(Default)]
pub struct InMemoryCarts {
    carts: RwLock<HashMap<String, CheckoutContext>>,
}

impl InMemoryCarts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, cart: CheckoutContext) {
        self.carts.write().await.insert(cart.cart_id.clone(), cart);
    }
}

#[async_trait]
impl CartProvider for InMemoryCarts {
    async fn load(&self, cart_id: &str) -> Result<Option<CheckoutContext>, CartError> {
        Ok(self.carts.read().await.get(cart_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stepup_core::CurrencyCode;

    #[tokio::test]
    async fn test_insert_and_load() {
        let carts = InMemoryCarts::new();
        carts
            .insert(CheckoutContext {
                cart_id: "42".to_string(),
                customer_id: Some(1),
                customer: None,
                delivery_address: None,
                invoice_address: None,
                order_total: dec!(9.99),
                currency: CurrencyCode::parse("EUR").unwrap(),
            })
            .await;

        let cart = carts.load("42").await.unwrap().unwrap();
        assert_eq!(cart.order_total, dec!(9.99));
        assert!(carts.load("43").await.unwrap().is_none());
    }
}
