use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stepup_checkout::{CartProvider, CheckoutFlow, StepUpOrchestrator};
use stepup_core::GatewayClient;
use stepup_gateway::{Config, GatewayMode, MpgsClient, SandboxGateway};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::Url;

pub mod checkout;
pub mod error;
pub mod metrics;
pub mod resiliency;
pub mod responder;
pub mod state;

pub use metrics::Metrics;
pub use responder::HttpResponder;
pub use state::AppState;

use resiliency::{CircuitBreaker, CircuitBreakerGateway};

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::USER_AGENT]);

    Router::new()
        .merge(checkout::routes())
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Wire the gateway, orchestrator and responder from configuration.
pub fn build_state(config: &Config, carts: Arc<dyn CartProvider>) -> anyhow::Result<AppState> {
    let gateway: Arc<dyn GatewayClient> = match config.gateway.mode {
        GatewayMode::Live => with_breaker(MpgsClient::new(&config.gateway)?, config),
        GatewayMode::Sandbox => {
            let acs_url = config
                .gateway
                .sandbox_acs_url
                .as_deref()
                .unwrap_or("https://acs.sandbox.invalid/challenge");
            with_breaker(SandboxGateway::new(Url::parse(acs_url)?), config)
        }
    };
    tracing::info!("Using {:?} gateway", config.gateway.mode);

    let public_base_url = Url::parse(&config.storefront.public_base_url)?;
    let review_url = public_base_url.join(&config.storefront.order_review_path)?;
    let start_url = public_base_url.join(&config.storefront.order_start_path)?;

    let metrics = Arc::new(Metrics::new()?);
    let orchestrator =
        StepUpOrchestrator::new(gateway, orchestrator_timeout(config.gateway.timeout()));
    let responder = HttpResponder::new(review_url, start_url, metrics.clone());
    let flow = CheckoutFlow::new(Arc::new(orchestrator), responder, config.gateway.enabled);

    Ok(AppState {
        carts,
        flow: Arc::new(flow),
        metrics,
        public_base_url,
    })
}

/// Headroom between the breaker's per-call deadline and the orchestrator's.
const ORCHESTRATOR_GRACE: Duration = Duration::from_secs(1);

/// Outer bound for the orchestrator. The breaker's own deadline must expire
/// first so a hanging gateway is counted as a failure.
pub fn orchestrator_timeout(gateway_timeout: Duration) -> Duration {
    gateway_timeout + ORCHESTRATOR_GRACE
}

fn with_breaker<G: GatewayClient + 'static>(gateway: G, config: &Config) -> Arc<dyn GatewayClient> {
    let breaker = CircuitBreaker::new(
        "mpgs",
        config.gateway.circuit_failure_threshold,
        config.gateway.circuit_reset(),
    );
    Arc::new(CircuitBreakerGateway::new(gateway, breaker, config.gateway.timeout()))
}
