//! Configuration management for the donation gateway.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{GatewayError, Result};
use crate::payments::{
    DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_CURRENCY, DEFAULT_ORGANIZATION,
};
use crate::ratelimit::{RateLimitPolicy, PAYMENT_INTENT_MAX_REQUESTS, PAYMENT_INTENT_WINDOW};

/// Prefix for environment overrides, e.g. `GATEWAY_SERVER__HTTP_ADDR`.
pub const ENV_PREFIX: &str = "GATEWAY";

/// Main configuration for the gateway service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Payment processor configuration
    #[serde(default)]
    pub payments: PaymentsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration for the payment-intent endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Interval between sweeps of expired records, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_max_requests() -> u32 {
    PAYMENT_INTENT_MAX_REQUESTS
}

fn default_window_ms() -> u64 {
    PAYMENT_INTENT_WINDOW.as_millis() as u64
}

fn default_sweep_interval() -> u64 {
    300
}

impl RateLimitingConfig {
    /// Validate into a limiter policy.
    pub fn policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(self.max_requests, Duration::from_millis(self.window_ms))
    }

    /// Sweep interval, rejecting zero.
    pub fn sweep_interval(&self) -> Result<Duration> {
        if self.sweep_interval_secs == 0 {
            return Err(GatewayError::Config(
                "rate_limiting.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Payment processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// Processor secret key; `STRIPE_SECRET_KEY` is used when unset
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Processor API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Processor API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Currency used when a request does not name one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Organization named in payment descriptions
    #[serde(default = "default_organization_name")]
    pub organization_name: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: default_api_base(),
            api_version: default_api_version(),
            default_currency: default_currency(),
            organization_name: default_organization_name(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_organization_name() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

impl GatewayConfig {
    /// Load configuration from an optional YAML file layered under
    /// `GATEWAY_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let config: GatewayConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| GatewayError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();

        assert_eq!(config.server.http_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.rate_limiting.max_requests, 5);
        assert_eq!(config.rate_limiting.window_ms, 60_000);
        assert_eq!(config.rate_limiting.sweep_interval_secs, 300);
        assert_eq!(config.payments.default_currency, "usd");
        assert!(config.payments.secret_key.is_none());
        assert_eq!(
            config.rate_limiting.policy().unwrap(),
            RateLimitPolicy::payment_intent()
        );
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
server:
  http_addr: "0.0.0.0:8080"
rate_limiting:
  max_requests: 10
"#;
        let config = GatewayConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.http_addr.port(), 8080);
        assert_eq!(config.rate_limiting.max_requests, 10);
        assert_eq!(config.rate_limiting.window_ms, 60_000);
        assert_eq!(config.payments.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_parse_empty_yaml_section() {
        let config = GatewayConfig::from_yaml("payments:\n  organization_name: Test Org\n").unwrap();
        assert_eq!(config.payments.organization_name, "Test Org");
        assert_eq!(config.rate_limiting.sweep_interval_secs, 300);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = GatewayConfig::from_yaml("rate_limiting: [").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_zero_policy_values_rejected() {
        let mut rate_limiting = RateLimitingConfig::default();
        rate_limiting.max_requests = 0;
        assert!(rate_limiting.policy().is_err());

        let mut rate_limiting = RateLimitingConfig::default();
        rate_limiting.window_ms = 0;
        assert!(rate_limiting.policy().is_err());

        let mut rate_limiting = RateLimitingConfig::default();
        rate_limiting.sweep_interval_secs = 0;
        assert!(matches!(
            rate_limiting.sweep_interval(),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.payments.api_version, DEFAULT_API_VERSION);
    }
}
