use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{ExchangeRate, Money};
use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// differences within this amount count as an exact payment
    pub tolerance: Money,
    /// largest allowed monthly payment change, in percent of the old value
    pub max_monthly_change_percent: Decimal,
    /// move the due date when a bot payment is reported, roll it back on reject
    pub optimistic_due_date: bool,
    pub edit_rate_limit: RateLimitConfig,
    pub sweep: SweepConfig,
    /// so'm per dollar used to value local-currency cash
    pub exchange_rate: ExchangeRate,
}

/// per-actor throttle for contract edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// overdue sweep cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub interval_hours: u32,
    /// delay before the first sweep after start-up
    pub initial_delay_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tolerance: Money::CENT,
            max_monthly_change_percent: dec!(50),
            optimistic_due_date: false,
            edit_rate_limit: RateLimitConfig::default(),
            sweep: SweepConfig::default(),
            exchange_rate: ExchangeRate::DEFAULT,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_hours: 24,
            initial_delay_secs: 5,
        }
    }
}

impl LedgerConfig {
    /// load from json, missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| LedgerError::Validation {
            field: "config".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_negative() {
            return Err(invalid("tolerance", "must not be negative"));
        }
        if self.max_monthly_change_percent <= Decimal::ZERO {
            return Err(invalid("max_monthly_change_percent", "must be positive"));
        }
        if self.edit_rate_limit.max_requests == 0 || self.edit_rate_limit.window_secs == 0 {
            return Err(invalid("edit_rate_limit", "limit and window must be positive"));
        }
        if self.sweep.interval_hours == 0 {
            return Err(invalid("sweep.interval_hours", "must be positive"));
        }
        ExchangeRate::new(self.exchange_rate.as_decimal())?;
        Ok(())
    }

    pub fn with_optimistic_due_date(mut self, enabled: bool) -> Self {
        self.optimistic_due_date = enabled;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Money) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_edit_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.edit_rate_limit = RateLimitConfig {
            max_requests,
            window_secs,
        };
        self
    }
}

fn invalid(field: &str, message: &str) -> LedgerError {
    LedgerError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.tolerance, Money::CENT);
        assert_eq!(config.max_monthly_change_percent, dec!(50));
        assert!(!config.optimistic_due_date);
        assert_eq!(config.edit_rate_limit.max_requests, 10);
        assert_eq!(config.sweep.interval_hours, 24);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json(r#"{ "optimistic_due_date": true, "exchange_rate": "12800" }"#).unwrap();
        assert!(config.optimistic_due_date);
        assert_eq!(config.exchange_rate.as_decimal(), dec!(12800));
        assert_eq!(config.max_monthly_change_percent, dec!(50));
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        assert!(LedgerConfig::from_json(r#"{ "exchange_rate": "0" }"#).is_err());
        assert!(LedgerConfig::from_json(r#"{ "edit_rate_limit": { "max_requests": 0, "window_secs": 60 } }"#).is_err());
        assert!(LedgerConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = LedgerConfig::default().with_optimistic_due_date(true);
        let json = config.to_json_pretty().unwrap();
        assert_eq!(LedgerConfig::from_json(&json).unwrap(), config);
    }
}
