//! ATM configuration
//!
//! Policy knobs for the account, the verification factors, the daily limits
//! and the display currency table. Defaults reproduce the reference ATM.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Main ATM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmConfig {
    /// Seeded account state
    #[serde(default)]
    pub account: AccountConfig,
    /// Verification and session policy
    #[serde(default)]
    pub security: SecurityConfig,
    /// Daily transaction limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Display currencies
    #[serde(default)]
    pub currency: CurrencyConfig,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            security: SecurityConfig::default(),
            limits: LimitsConfig::default(),
            currency: CurrencyConfig::default(),
        }
    }
}

/// Account seed values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Balance at process start
    pub initial_balance: Decimal,
    /// PIN the account is created with
    pub default_pin: String,
    /// Enrolled biometric template (stored as a digest only)
    pub biometric_template: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::new(100_000, 2), // 1000.00
            default_pin: "1234".to_string(),
            biometric_template: "fingerprint123".to_string(),
        }
    }
}

/// Verification factor and session policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Attempt budget per factor
    pub max_attempts: u32,
    /// Validity window of an OTP challenge
    #[serde(with = "humantime_serde")]
    pub otp_validity: Duration,
    /// Number of OTP digits
    pub otp_digits: u32,
    /// Idle timeout (sliding window)
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,
    /// Success probability of the simulated fingerprint scanner
    pub biometric_success_rate: f64,
    /// Out-of-band admin unlock secret
    pub admin_code: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            otp_validity: Duration::from_secs(30),
            otp_digits: 6,
            session_timeout: Duration::from_secs(60),
            biometric_success_rate: 0.9,
            admin_code: "ADMIN123".to_string(),
        }
    }
}

/// Daily transaction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Cumulative withdrawals allowed per calendar day
    pub daily_withdrawal: Decimal,
    /// Cumulative deposits allowed per calendar day
    pub daily_deposit: Decimal,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_withdrawal: Decimal::new(100_000, 2), // 1000.00
            daily_deposit: Decimal::new(500_000, 2),    // 5000.00
        }
    }
}

/// Display currency table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Unit the account balance is kept in
    pub base: String,
    /// Units of each currency per one base unit
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), Decimal::ONE);
        rates.insert("EUR".to_string(), Decimal::new(92, 2));
        rates.insert("TZS".to_string(), Decimal::new(2600, 0));
        Self {
            base: "USD".to_string(),
            rates,
        }
    }
}

impl AtmConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.account.initial_balance.is_sign_negative() {
            errors.push("Initial balance must not be negative".to_string());
        }
        if !crate::credentials::is_valid_pin(&self.account.default_pin) {
            errors.push("Default PIN must be exactly 4 digits".to_string());
        }
        if self.account.biometric_template.is_empty() {
            errors.push("Biometric template must be set".to_string());
        }

        if self.security.max_attempts == 0 {
            errors.push("Max attempts must be at least 1".to_string());
        }
        if !(4..=9).contains(&self.security.otp_digits) {
            errors.push("OTP digits must be between 4 and 9".to_string());
        }
        if self.security.otp_validity.is_zero() {
            errors.push("OTP validity must be greater than zero".to_string());
        }
        if self.security.session_timeout.is_zero() {
            errors.push("Session timeout must be greater than zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.security.biometric_success_rate) {
            errors.push("Biometric success rate must be within [0, 1]".to_string());
        }
        if self.security.admin_code.is_empty() {
            errors.push("Admin code must be set".to_string());
        }

        if self.limits.daily_withdrawal <= Decimal::ZERO {
            errors.push("Daily withdrawal limit must be positive".to_string());
        }
        if self.limits.daily_deposit <= Decimal::ZERO {
            errors.push("Daily deposit limit must be positive".to_string());
        }

        if !self.currency.rates.contains_key(&self.currency.base) {
            errors.push(format!(
                "Base currency '{}' missing from the rate table",
                self.currency.base
            ));
        }
        if self.currency.rates.values().any(|rate| *rate <= Decimal::ZERO) {
            errors.push("Exchange rates must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = AtmConfig::default();
        assert_eq!(config.account.initial_balance, dec!(1000.00));
        assert_eq!(config.security.max_attempts, 3);
        assert_eq!(config.security.otp_validity, Duration::from_secs(30));
        assert_eq!(config.security.session_timeout, Duration::from_secs(60));
        assert_eq!(config.limits.daily_withdrawal, dec!(1000));
        assert_eq!(config.limits.daily_deposit, dec!(5000));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AtmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_collects_errors() {
        let mut config = AtmConfig::default();
        config.account.default_pin = "12a4".to_string();
        config.security.max_attempts = 0;
        config.limits.daily_deposit = Decimal::ZERO;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AtmConfig = serde_json::from_str(
            r#"{"security": {"session_timeout": "2m"}, "limits": {"daily_withdrawal": "400"}}"#,
        )
        .unwrap();

        assert_eq!(config.security.session_timeout, Duration::from_secs(120));
        assert_eq!(config.security.max_attempts, 3);
        assert_eq!(config.security.admin_code, "ADMIN123");
        assert_eq!(config.limits.daily_withdrawal, dec!(400));
        assert_eq!(config.limits.daily_deposit, dec!(5000));
        assert_eq!(config.account.default_pin, "1234");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_base_rate() {
        let mut config = AtmConfig::default();
        config.currency.base = "GBP".to_string();
        assert!(config.validate().is_err());
    }
}
