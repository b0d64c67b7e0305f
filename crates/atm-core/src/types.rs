//! Shared vocabulary for the ATM core
//!
//! Small enums and value helpers used across the verification pipeline,
//! the limit ledger and the audit trail.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AtmError, AtmResult};

/// Verification factor of the MFA pipeline, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Factor {
    /// Four digit personal identification number
    Pin,
    /// One-time passcode delivered out of band
    Otp,
    /// Fingerprint scan
    Biometric,
}

impl Factor {
    /// All factors, in the order the pipeline checks them
    pub const ALL: [Factor; 3] = [Factor::Pin, Factor::Otp, Factor::Biometric];

    /// Lowercase label used in reason codes and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Otp => "otp",
            Self::Biometric => "biometric",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pin => write!(f, "PIN"),
            Self::Otp => write!(f, "OTP"),
            Self::Biometric => write!(f, "biometric"),
        }
    }
}

/// Kind of money movement gated by a daily limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitKind {
    Withdrawal,
    Deposit,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawal => "withdrawal",
            Self::Deposit => "deposit",
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entry recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    BalanceCheck,
    Deposit,
    Withdrawal,
    PinChange,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BalanceCheck => "Balance Check",
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::PinChange => "PIN Change",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<LimitKind> for TransactionKind {
    fn from(kind: LimitKind) -> Self {
        match kind {
            LimitKind::Withdrawal => Self::Withdrawal,
            LimitKind::Deposit => Self::Deposit,
        }
    }
}

/// Format an amount with two decimal places
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Parse an amount typed at the console
///
/// Malformed input becomes `InvalidInput`; the sign is checked later by the
/// operation itself.
pub fn parse_amount(input: &str) -> AtmResult<Decimal> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed).map_err(|e| AtmError::InvalidInput {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(1500)), "1500.00");
        assert_eq!(format_money(dec!(12.5)), "12.50");
        assert_eq!(format_money(dec!(0.005)), "0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 500.00 ").unwrap(), dec!(500));
        assert_eq!(parse_amount("-3").unwrap(), dec!(-3));

        let err = parse_amount("five hundred").unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
    }

    #[test]
    fn test_factor_order() {
        assert_eq!(Factor::ALL[0], Factor::Pin);
        assert_eq!(Factor::ALL[2], Factor::Biometric);
        assert_eq!(Factor::Otp.as_str(), "otp");
    }
}
