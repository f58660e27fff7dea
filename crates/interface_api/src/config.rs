//! API configuration

use core_kernel::Currency;
use domain_billing::{BillingConfig, OverpaymentPolicy};
use rust_decimal::Decimal;
use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Flat charge per consumed volume unit
    pub rate_per_unit: Decimal,
    /// Billing currency (ISO 4217 code)
    pub currency: String,
    /// Reject payments that exceed a bill's outstanding balance
    pub reject_overpayment: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/waterworks".to_string(),
            log_level: "info".to_string(),
            rate_per_unit: Decimal::new(100, 0),
            currency: "KES".to_string(),
            reject_overpayment: false,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the billing engine configuration
    ///
    /// # Errors
    ///
    /// Fails when the configured currency code is unknown
    pub fn billing_config(&self) -> Result<BillingConfig, config::ConfigError> {
        let currency: Currency = self.currency.parse().map_err(|_| {
            config::ConfigError::Message(format!("unknown currency code: {}", self.currency))
        })?;

        Ok(BillingConfig {
            currency,
            rate_per_unit: self.rate_per_unit,
            overpayment: if self.reject_overpayment {
                OverpaymentPolicy::Reject
            } else {
                OverpaymentPolicy::Allow
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_billing_config() {
        let config = ApiConfig::default();
        let billing = config.billing_config().unwrap();

        assert_eq!(billing.currency, Currency::KES);
        assert_eq!(billing.rate_per_unit, Decimal::new(100, 0));
        assert_eq!(billing.overpayment, OverpaymentPolicy::Allow);
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let config = ApiConfig {
            currency: "XYZ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.billing_config().is_err());
    }
}
