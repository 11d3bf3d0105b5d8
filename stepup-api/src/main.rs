use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::sync::Arc;
use stepup_api::{app, build_state};
use stepup_checkout::{CheckoutContext, InMemoryCarts};
use stepup_core::{Address, Contact, CurrencyCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "stepup_api=debug,stepup_checkout=debug,stepup_gateway=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stepup_gateway::Config::load()?;
    tracing::info!("Starting 3-D Secure checkout service on port {}", config.server.port);

    let carts = Arc::new(InMemoryCarts::new());
    carts.insert(demo_cart()?).await;

    let app = app(build_state(&config, carts)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Cart `1`, ready for payment, so the flow can be driven by hand.
fn demo_cart() -> anyhow::Result<CheckoutContext> {
    let address = Address {
        address1: "1 Demo Street".to_string(),
        city: "Springfield".to_string(),
        postcode: "12345".to_string(),
        country_iso2: "US".to_string(),
        firstname: "Demo".to_string(),
        lastname: "Shopper".to_string(),
        ..Default::default()
    };

    Ok(CheckoutContext {
        cart_id: "1".to_string(),
        customer_id: Some(1),
        customer: Some(Contact {
            email: Some("demo@shop.example".to_string()),
            ..Contact::from(&address)
        }),
        delivery_address: Some(address.clone()),
        invoice_address: Some(address),
        order_total: Decimal::new(10000, 2),
        currency: CurrencyCode::parse("USD")?,
    })
}
