//! ATM error types
//!
//! One closed error enum for every operation of the core. Each variant
//! belongs to exactly one [`ErrorCategory`] and carries enough context to
//! reconstruct the decision (factor, remaining attempts, limit, amounts).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{format_money, Factor, LimitKind};

/// Result type alias for ATM operations
pub type AtmResult<T> = Result<T, AtmError>;

/// Coarse classification of an [`AtmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad amount or format, re-prompt
    Validation,
    /// Wrong credential, attempt budget decremented
    Auth,
    /// Account locked until an admin unlock
    Locked,
    /// Transaction refused by a limit or the balance
    Policy,
    /// Session idle for too long
    Timeout,
    /// Operation issued outside of the right session state
    Session,
    /// The console collaborator failed
    Input,
}

/// ATM error types
#[derive(Debug, Error)]
pub enum AtmError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Amount is zero, negative or finer than a cent
    #[error("Invalid amount {amount}: must be positive with at most two decimal places")]
    InvalidAmount { amount: Decimal },

    /// Amount too large to convert or add up
    #[error("Amount {amount} is out of range")]
    AmountOutOfRange { amount: Decimal },

    /// Console input could not be parsed
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// New PIN is not exactly four digits
    #[error("New PIN must be exactly 4 digits")]
    InvalidPinFormat,

    /// Currency code missing from the exchange table
    #[error("Unknown currency '{code}'")]
    UnknownCurrency { code: String },

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// PIN digest mismatch
    #[error("Invalid PIN, {remaining} attempts remaining")]
    PinInvalid { remaining: u32 },

    /// No live OTP challenge, or the challenge window has passed
    #[error("OTP has expired or is invalid")]
    OtpExpired,

    /// OTP mismatch
    #[error("Invalid OTP, {remaining} attempts remaining")]
    OtpInvalid { remaining: u32 },

    /// Fingerprint scan rejected
    #[error("Fingerprint scan failed, {remaining} attempts remaining")]
    BiometricFailed { remaining: u32 },

    // =========================================================================
    // Lock Errors
    // =========================================================================
    /// Account was already locked when authentication started
    #[error("Account is locked, contact the bank to reset")]
    AccountLocked,

    /// The attempt budget of a factor ran out and locked the account
    #[error("Too many failed {factor} attempts, account locked")]
    FactorLocked { factor: Factor },

    // =========================================================================
    // Policy Errors
    // =========================================================================
    /// Cumulative daily amount would exceed the limit
    #[error(
        "{kind} of {} exceeds daily limit of {} ({} already used)",
        format_money(*.requested),
        format_money(*.limit),
        format_money(*.used)
    )]
    LimitExceeded {
        kind: LimitKind,
        limit: Decimal,
        used: Decimal,
        requested: Decimal,
    },

    /// Withdrawal larger than the balance
    #[error(
        "Insufficient funds: balance {}, requested {}",
        format_money(*.balance),
        format_money(*.requested)
    )]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    // =========================================================================
    // Timeout Errors
    // =========================================================================
    /// Idle time exceeded the session timeout
    #[error("Session timed out after {idle_secs}s of inactivity")]
    SessionTimedOut { idle_secs: i64 },

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Operation requires an authenticated session
    #[error("Authentication required")]
    NotAuthenticated,

    /// Sensitive operation requires a fresh MFA run
    #[error("Fresh multi-factor authentication required")]
    StepUpRequired,

    /// A verification step was submitted out of pipeline order
    #[error("Expected {expected} verification")]
    OutOfSequence { expected: &'static str },

    /// Admin unlock code mismatch
    #[error("Invalid admin code")]
    InvalidAdminCode,

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Console was closed while a value was expected
    #[error("Input closed")]
    InputClosed,

    /// Console I/O failure
    #[error("Console error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtmError {
    /// Get the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAmount { .. }
            | Self::AmountOutOfRange { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidPinFormat
            | Self::UnknownCurrency { .. } => ErrorCategory::Validation,

            Self::PinInvalid { .. }
            | Self::OtpExpired
            | Self::OtpInvalid { .. }
            | Self::BiometricFailed { .. }
            | Self::InvalidAdminCode => ErrorCategory::Auth,

            Self::AccountLocked | Self::FactorLocked { .. } => ErrorCategory::Locked,

            Self::LimitExceeded { .. } | Self::InsufficientFunds { .. } => ErrorCategory::Policy,

            Self::SessionTimedOut { .. } => ErrorCategory::Timeout,

            Self::NotAuthenticated | Self::StepUpRequired | Self::OutOfSequence { .. } => {
                ErrorCategory::Session
            }

            Self::InputClosed | Self::Io(_) => ErrorCategory::Input,
        }
    }

    /// Stable reason code (safe to log and to show)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::AmountOutOfRange { .. } => "amount_out_of_range",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InvalidPinFormat => "invalid_pin_format",
            Self::UnknownCurrency { .. } => "unknown_currency",
            Self::PinInvalid { .. } => "pin_invalid",
            Self::OtpExpired => "otp_expired",
            Self::OtpInvalid { .. } => "otp_invalid",
            Self::BiometricFailed { .. } => "biometric_failed",
            // Short-circuit on an already locked account reads like a PIN lock
            Self::AccountLocked => "pin_locked",
            Self::FactorLocked { factor: Factor::Pin } => "pin_locked",
            Self::FactorLocked { factor: Factor::Otp } => "otp_locked",
            Self::FactorLocked { factor: Factor::Biometric } => "biometric_locked",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::SessionTimedOut { .. } => "session_timeout",
            Self::NotAuthenticated => "not_authenticated",
            Self::StepUpRequired => "step_up_required",
            Self::OutOfSequence { .. } => "out_of_sequence",
            Self::InvalidAdminCode => "invalid_admin_code",
            Self::InputClosed => "input_closed",
            Self::Io(_) => "console_error",
        }
    }

    /// Whether the interactive session has to end after this error
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Locked | ErrorCategory::Timeout | ErrorCategory::Input
        )
    }

    /// Whether the same step may be retried after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PinInvalid { .. } | Self::OtpInvalid { .. } | Self::BiometricFailed { .. }
        ) || self.category() == ErrorCategory::Validation
    }
}
