use crate::domain::commission::CommissionPolicy;
use crate::domain::money::Currency;
use crate::error::{Result, SettlementError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the gateway's secret API key.
pub const GATEWAY_API_KEY_ENV: &str = "STRIPE_SECRET_KEY";
/// Environment variable holding the webhook signing secret.
pub const WEBHOOK_SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";

/// Runtime configuration. Every field has a default, so a config file only
/// needs to name what it overrides. Secrets never live here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub currency: Currency,
    pub commission: CommissionPolicy,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Upper bound for each gateway call.
    pub timeout_secs: u64,
    /// Accepted age of a signed webhook.
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stripe.com".to_string(),
            timeout_secs: 15,
            webhook_tolerance_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Loads a JSON config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw).map_err(|e| {
                    SettlementError::Config(format!("{}: {e}", path.display()))
                })?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.timeout_secs == 0 || self.gateway.timeout_secs > 60 {
            return Err(SettlementError::Config(format!(
                "gateway.timeout_secs must be within 1..=60, got {}",
                self.gateway.timeout_secs
            )));
        }
        let fee = &self.commission.gateway_fee;
        if fee.rate.is_sign_negative() || fee.fixed.is_negative() {
            return Err(SettlementError::Config(
                "gateway fee rate and fixed surcharge must not be negative".to_string(),
            ));
        }
        url::Url::parse(&self.gateway.base_url)
            .map_err(|e| SettlementError::Config(format!("gateway.base_url: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.currency.as_str(), "eur");
        assert_eq!(config.gateway.timeout(), Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "currency": "USD", "gateway": {{ "timeout_secs": 10 }}, "logging": {{ "json": true }} }}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.currency.as_str(), "usd");
        assert_eq!(config.gateway.timeout_secs, 10);
        assert_eq!(config.gateway.base_url, "https://api.stripe.com");
        assert!(config.logging.json);
        assert_eq!(config.commission, CommissionPolicy::default());
    }

    #[test]
    fn test_rejects_unbounded_timeout() {
        let mut config = Config::default();
        config.gateway.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(SettlementError::Config(_))));
    }
}
