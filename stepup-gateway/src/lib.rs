pub mod app_config;
pub mod mpgs;
pub mod sandbox;

pub use app_config::{Config, GatewayConfig, GatewayMode, ServerConfig, StorefrontConfig};
pub use mpgs::MpgsClient;
pub use sandbox::SandboxGateway;
