use serde::Deserialize;
use std::env;
use std::time::Duration;
use stepup_shared::Masked;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub storefront: StorefrontConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    /// Real MPGS REST API.
    Live,
    /// In-process gateway with scripted answers, for local runs.
    Sandbox,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Payment module switch; checkouts are sent back to step 1 when off.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mode")]
    pub mode: GatewayMode,
    pub api_endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: u32,
    pub merchant_id: String,
    pub api_password: Masked<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_circuit_failure_threshold")]
    pub circuit_failure_threshold: usize,
    #[serde(default = "default_circuit_reset_seconds")]
    pub circuit_reset_seconds: u64,
    /// ACS page the sandbox gateway points cardholders at.
    pub sandbox_acs_url: Option<String>,
}

fn default_enabled() -> bool { true }
fn default_mode() -> GatewayMode { GatewayMode::Live }
fn default_api_version() -> u32 { 61 }
fn default_timeout_seconds() -> u64 { 30 }
fn default_circuit_failure_threshold() -> usize { 5 }
fn default_circuit_reset_seconds() -> u64 { 30 }

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn circuit_reset(&self) -> Duration {
        Duration::from_secs(self.circuit_reset_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorefrontConfig {
    /// Public origin the shopper's browser sees, e.g. `https://shop.example`.
    pub public_base_url: String,
    #[serde(default = "default_order_path")]
    pub order_review_path: String,
    #[serde(default = "default_order_path")]
    pub order_start_path: String,
}

fn default_order_path() -> String { "/order".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `STEPUP_GATEWAY__MERCHANT_ID=TEST123` sets `gateway.merchant_id`
            .add_source(config::Environment::with_prefix("STEPUP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
