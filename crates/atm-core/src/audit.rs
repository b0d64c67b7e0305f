//! Audit Trail and audit sink
//!
//! Two separate outputs:
//! - the [`AuditTrail`]: append-only, hash-chained transaction records
//!   belonging to the account (what "view history" shows)
//! - the [`AuditSink`]: a stream of structured [`AuditEvent`]s, one per
//!   state transition, written wherever the caller wants (log file, memory)

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::types::{format_money, Factor, LimitKind, TransactionKind};

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// =============================================================================
// Audit Trail
// =============================================================================

/// Immutable record of a completed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Position in the trail, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: Option<Decimal>,
    /// Balance after the operation
    pub balance: Decimal,
    /// Hash of the previous record (zeros for the first)
    pub previous_hash: String,
    pub hash: String,
}

impl TransactionRecord {
    /// Compute hash of this record
    pub fn compute_hash(&self) -> String {
        let content = format!(
            "{}:{}:{}:{:?}:{}:{}",
            self.previous_hash,
            self.sequence,
            self.timestamp.timestamp_millis(),
            self.kind,
            self.amount.map(format_money).unwrap_or_default(),
            format_money(self.balance),
        );
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify the record hash
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

impl std::fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stamp = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match self.amount {
            Some(amount) => write!(
                f,
                "{} - {} - Amount: {} - Balance: {}",
                stamp,
                self.kind,
                format_money(amount),
                format_money(self.balance)
            ),
            None if self.kind == TransactionKind::BalanceCheck => write!(
                f,
                "{} - {} - Balance: {}",
                stamp,
                self.kind,
                format_money(self.balance)
            ),
            None => write!(f, "{} - {}", stamp, self.kind),
        }
    }
}

/// Append-only ordered sequence of transaction records
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    records: Vec<TransactionRecord>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, chaining it to the previous one
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: TransactionKind,
        amount: Option<Decimal>,
        balance: Decimal,
    ) -> &TransactionRecord {
        let previous_hash = self
            .records
            .last()
            .map(|r| r.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut record = TransactionRecord {
            sequence: self.records.len() as u64 + 1,
            timestamp,
            kind,
            amount,
            balance,
            previous_hash,
            hash: String::new(),
        };
        record.hash = record.compute_hash();

        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Verify every record hash and every chain link
    pub fn verify_chain(&self) -> bool {
        let mut previous = GENESIS_HASH;
        for record in &self.records {
            if record.previous_hash != previous || !record.verify() {
                return false;
            }
            previous = &record.hash;
        }
        true
    }
}

// =============================================================================
// Audit Events
// =============================================================================

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuditLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditEventKind {
    AccountOpened { balance: Decimal },
    LoginRejectedLocked,
    PinVerified,
    PinRejected { remaining: u32 },
    OtpIssued { expires_at: DateTime<Utc> },
    OtpVerified,
    OtpRejected { remaining: u32 },
    OtpExpired,
    BiometricVerified,
    BiometricRejected { remaining: u32 },
    AccountLocked { factor: Factor },
    Authenticated,
    StepUpGranted,
    SessionTimedOut { idle_secs: i64 },
    LoggedOut,
    DailyLimitsReset { date: chrono::NaiveDate },
    TransactionCompleted {
        kind: TransactionKind,
        amount: Option<Decimal>,
        balance: Decimal,
    },
    TransactionRejected {
        operation: String,
        reason: String,
        detail: String,
    },
    LimitExceeded {
        kind: LimitKind,
        limit: Decimal,
        used: Decimal,
        requested: Decimal,
    },
    HistoryViewed { records: usize },
    AdminUnlock,
    AdminUnlockRejected,
    InvalidMenuOption { choice: String },
}

/// One structured audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub kind: AuditEventKind,
    pub message: String,
}

impl AuditEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: AuditLevel,
        kind: AuditEventKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            kind,
            message: message.into(),
        }
    }
}

/// Destination of audit events
pub trait AuditSink: Send {
    fn record(&mut self, event: &AuditEvent);
}

/// Forwards audit events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: &AuditEvent) {
        let timestamp = event.timestamp.to_rfc3339();
        let kind = format!("{:?}", event.kind);
        match event.level {
            AuditLevel::Debug => {
                tracing::debug!(target: "atm::audit", %timestamp, %kind, "{}", event.message)
            }
            AuditLevel::Info => {
                tracing::info!(target: "atm::audit", %timestamp, %kind, "{}", event.message)
            }
            AuditLevel::Warning => {
                tracing::warn!(target: "atm::audit", %timestamp, %kind, "{}", event.message)
            }
            AuditLevel::Error => {
                tracing::error!(target: "atm::audit", %timestamp, %kind, "{}", event.message)
            }
            AuditLevel::Critical => tracing::error!(
                target: "atm::audit",
                %timestamp,
                %kind,
                critical = true,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps events in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Events matching a predicate on their kind
    pub fn count(&self, predicate: impl Fn(&AuditEventKind) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(&e.kind)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&mut self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Fan an event out to several sinks
pub struct MultiSink {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for MultiSink {
    fn record(&mut self, event: &AuditEvent) {
        for sink in &mut self.sinks {
            sink.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, secs).unwrap()
    }

    #[test]
    fn test_append_chains_records() {
        let mut trail = AuditTrail::new();
        trail.append(at(0), TransactionKind::Deposit, Some(dec!(500)), dec!(1500));
        trail.append(at(1), TransactionKind::BalanceCheck, None, dec!(1500));

        let records = trail.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[0].previous_hash, GENESIS_HASH);
        assert_eq!(records[1].previous_hash, records[0].hash);
        assert!(trail.verify_chain());
    }

    #[test]
    fn test_tampering_breaks_chain() {
        let mut trail = AuditTrail::new();
        trail.append(at(0), TransactionKind::Deposit, Some(dec!(500)), dec!(1500));
        trail.append(at(1), TransactionKind::Withdrawal, Some(dec!(100)), dec!(1400));

        let mut tampered = trail.clone();
        tampered.records[0].amount = Some(dec!(5000));
        assert!(!tampered.verify_chain());
    }

    #[test]
    fn test_record_display() {
        let mut trail = AuditTrail::new();
        let deposit = trail
            .append(at(5), TransactionKind::Deposit, Some(dec!(500)), dec!(1500))
            .to_string();
        assert_eq!(
            deposit,
            "2026-07-01 12:00:05 - Deposit - Amount: 500.00 - Balance: 1500.00"
        );

        let check = trail
            .append(at(6), TransactionKind::BalanceCheck, None, dec!(1500))
            .to_string();
        assert_eq!(check, "2026-07-01 12:00:06 - Balance Check - Balance: 1500.00");

        let pin = trail
            .append(at(7), TransactionKind::PinChange, None, dec!(1500))
            .to_string();
        assert_eq!(pin, "2026-07-01 12:00:07 - PIN Change");
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemoryAuditSink::new();
        let mut writer = sink.clone();
        writer.record(&AuditEvent::new(
            at(0),
            AuditLevel::Info,
            AuditEventKind::PinVerified,
            "PIN verification successful",
        ));

        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.count(|k| matches!(k, AuditEventKind::PinVerified)), 1);
    }

    #[test]
    fn test_multi_sink_fans_out() {
        let a = MemoryAuditSink::new();
        let b = MemoryAuditSink::new();
        let mut multi = MultiSink::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
        multi.record(&AuditEvent::new(
            at(0),
            AuditLevel::Warning,
            AuditEventKind::OtpExpired,
            "OTP expired",
        ));

        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn test_rejection_event_serde() {
        let event = AuditEvent::new(
            at(9),
            AuditLevel::Warning,
            AuditEventKind::TransactionRejected {
                operation: "withdrawal".to_string(),
                reason: "limit_exceeded".to_string(),
                detail: "Daily withdrawal limit exceeded".to_string(),
            },
            "withdrawal rejected",
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
