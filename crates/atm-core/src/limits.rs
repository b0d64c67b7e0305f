//! Daily Limit Ledger
//!
//! Calendar-day caps on cumulative deposits and withdrawals. Rollover is
//! lazy: the first operation that observes a new date resets `used`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;
use crate::error::{AtmError, AtmResult};
use crate::types::LimitKind;

/// Cap, consumption and date of last reset for one kind of movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimitEntry {
    pub limit: Decimal,
    pub used: Decimal,
    pub date: NaiveDate,
}

impl DailyLimitEntry {
    pub fn new(limit: Decimal, date: NaiveDate) -> Self {
        Self {
            limit,
            used: Decimal::ZERO,
            date,
        }
    }

    /// Amount still available today
    pub fn remaining(&self) -> Decimal {
        (self.limit - self.used).max(Decimal::ZERO)
    }

    /// Reset `used` if `today` differs from the stored date
    fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.used = Decimal::ZERO;
        self.date = today;
        true
    }
}

/// Withdrawal and deposit limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLimitLedger {
    withdrawal: DailyLimitEntry,
    deposit: DailyLimitEntry,
}

impl DailyLimitLedger {
    pub fn new(config: &LimitsConfig, today: NaiveDate) -> Self {
        Self {
            withdrawal: DailyLimitEntry::new(config.daily_withdrawal, today),
            deposit: DailyLimitEntry::new(config.daily_deposit, today),
        }
    }

    pub fn entry(&self, kind: LimitKind) -> &DailyLimitEntry {
        match kind {
            LimitKind::Withdrawal => &self.withdrawal,
            LimitKind::Deposit => &self.deposit,
        }
    }

    /// Roll every entry over to `today`; returns whether anything was reset
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let withdrawal = self.withdrawal.roll_over(today);
        let deposit = self.deposit.roll_over(today);
        withdrawal || deposit
    }

    /// Consumption after adding `amount`, or `LimitExceeded` if over the cap
    ///
    /// Does not mutate; pair with [`commit`](Self::commit) once every other
    /// check has passed.
    pub fn check(&self, kind: LimitKind, amount: Decimal) -> AtmResult<Decimal> {
        let entry = self.entry(kind);
        let exceeded = || AtmError::LimitExceeded {
            kind,
            limit: entry.limit,
            used: entry.used,
            requested: amount,
        };

        let would_use = entry.used.checked_add(amount).ok_or_else(exceeded)?;
        if would_use > entry.limit {
            return Err(exceeded());
        }

        Ok(would_use)
    }

    /// Record consumption previously returned by [`check`](Self::check)
    pub fn commit(&mut self, kind: LimitKind, would_use: Decimal) {
        match kind {
            LimitKind::Withdrawal => self.withdrawal.used = would_use,
            LimitKind::Deposit => self.deposit.used = would_use,
        }
    }
}
