//! Lockout Policy
//!
//! One attempt budget per verification factor plus the account lock flag.
//! A budget starts full, refills on a successful verification of its factor
//! and drains on failures. Draining any budget locks the account; only an
//! admin reset clears the lock and refills all three budgets.

use crate::types::Factor;

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Budget left for another try
    Retry { remaining: u32 },
    /// Budget exhausted, account is now locked
    Locked,
}

/// Attempt budgets and lock flag for the account
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    max_attempts: u32,
    pin: u32,
    otp: u32,
    biometric: u32,
    locked_by: Option<Factor>,
    locked: bool,
}

impl LockoutPolicy {
    /// Create a policy with every budget full
    pub fn new(max_attempts: u32) -> Self {
        let max_attempts = max_attempts.max(1);
        Self {
            max_attempts,
            pin: max_attempts,
            otp: max_attempts,
            biometric: max_attempts,
            locked_by: None,
            locked: false,
        }
    }

    /// Whether the account is locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Factor whose budget caused the current lock
    pub fn locked_by(&self) -> Option<Factor> {
        self.locked_by
    }

    /// Remaining attempts for a factor
    pub fn remaining(&self, factor: Factor) -> u32 {
        match factor {
            Factor::Pin => self.pin,
            Factor::Otp => self.otp,
            Factor::Biometric => self.biometric,
        }
    }

    /// Configured budget size
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Refill the budget of a factor after a successful verification
    pub fn record_success(&mut self, factor: Factor) {
        *self.budget_mut(factor) = self.max_attempts;
    }

    /// Drain one attempt; locks the account when the budget hits zero
    pub fn record_failure(&mut self, factor: Factor) -> FailureOutcome {
        let budget = self.budget_mut(factor);
        *budget = budget.saturating_sub(1);
        let remaining = *budget;

        if remaining == 0 {
            self.lock(factor);
            FailureOutcome::Locked
        } else {
            FailureOutcome::Retry { remaining }
        }
    }

    /// Lock the account on behalf of a factor
    pub fn lock(&mut self, factor: Factor) {
        self.locked = true;
        self.locked_by.get_or_insert(factor);
    }

    /// Admin reset: clear the lock and refill every budget
    pub fn reset(&mut self) {
        self.pin = self.max_attempts;
        self.otp = self.max_attempts;
        self.biometric = self.max_attempts;
        self.locked = false;
        self.locked_by = None;
    }

    fn budget_mut(&mut self, factor: Factor) -> &mut u32 {
        match factor {
            Factor::Pin => &mut self.pin,
            Factor::Otp => &mut self.otp,
            Factor::Biometric => &mut self.biometric,
        }
    }
}
