//! Static exchange table
//!
//! The account keeps every amount in the base currency. The table only
//! converts at the edges: amounts typed in another currency on the way in,
//! balances shown in another currency on the way out. Rates are fixed at
//! start-up; there is no live feed.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::config::CurrencyConfig;
use crate::error::{AtmError, AtmResult};

/// Rates expressed as units of a currency per one base unit
#[derive(Debug, Clone)]
pub struct ExchangeTable {
    base: String,
    rates: BTreeMap<String, Decimal>,
}

impl ExchangeTable {
    pub fn new(config: &CurrencyConfig) -> Self {
        let mut rates: BTreeMap<String, Decimal> = config
            .rates
            .iter()
            .filter(|(_, rate)| **rate > Decimal::ZERO)
            .map(|(code, rate)| (code.to_ascii_uppercase(), *rate))
            .collect();
        let base = config.base.to_ascii_uppercase();
        rates.insert(base.clone(), Decimal::ONE);

        Self { base, rates }
    }

    /// Base currency code
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Supported codes, sorted
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    /// Normalise and look up a currency code
    pub fn resolve(&self, code: &str) -> AtmResult<&str> {
        let normalized = code.trim().to_ascii_uppercase();
        self.rates
            .get_key_value(&normalized)
            .map(|(code, _)| code.as_str())
            .ok_or(AtmError::UnknownCurrency {
                code: code.trim().to_string(),
            })
    }

    pub fn rate(&self, code: &str) -> AtmResult<Decimal> {
        let code = self.resolve(code)?;
        Ok(self.rates[code])
    }

    /// Convert an amount in `code` to the base currency, rounded to cents
    pub fn to_base(&self, amount: Decimal, code: &str) -> AtmResult<Decimal> {
        let rate = self.rate(code)?;
        amount
            .checked_div(rate)
            .map(|base| base.round_dp(2))
            .ok_or(AtmError::AmountOutOfRange { amount })
    }

    /// Convert a base amount into `code`, rounded to cents
    pub fn from_base(&self, amount: Decimal, code: &str) -> AtmResult<Decimal> {
        let rate = self.rate(code)?;
        amount
            .checked_mul(rate)
            .map(|converted| converted.round_dp(2))
            .ok_or(AtmError::AmountOutOfRange { amount })
    }
}

impl Default for ExchangeTable {
    fn default() -> Self {
        Self::new(&CurrencyConfig::default())
    }
}
