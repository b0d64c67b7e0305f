//! ATM session core
//!
//! Single-account ATM simulator core:
//!
//! - **MFA pipeline**: PIN, then a time-limited OTP, then a fingerprint scan
//! - **Lockout policy**: three attempts per factor, lock until admin unlock
//! - **Session timeout**: sliding idle window, evaluated lazily
//! - **Daily limits**: per-kind caps reset on calendar-date rollover
//! - **Audit**: hash-chained transaction trail plus structured audit events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Account                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  authenticate / step_up                                      │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  CredentialStore ──► OtpService ──► BiometricScanner         │
//! │        (PIN)          (OTP)           (scan)                 │
//! │     └──────────── LockoutPolicy ─────────┘                   │
//! │                                                              │
//! │  check_balance / deposit / withdraw / change_pin / history   │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  SessionClock ──► DailyLimitLedger ──► balance ──► AuditTrail│
//! └──────────────────────────────────────────────────────────────┘
//!            │                         │
//!            ▼                         ▼
//!          Clock                   AuditSink
//! ```
//!
//! Every external dependency (clock, OTP delivery, scanner, console, audit
//! sink) is injected, so the whole state machine runs deterministically in
//! tests; the `testing` feature exposes scripted doubles for them.

pub mod account;
pub mod audit;
pub mod biometric;
pub mod clock;
pub mod config;
pub mod console;
pub mod credentials;
pub mod currency;
pub mod error;
pub mod limits;
pub mod lockout;
pub mod otp;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use account::{Account, Collaborators, MfaPurpose};
pub use audit::{
    AuditEvent, AuditEventKind, AuditLevel, AuditSink, AuditTrail, MemoryAuditSink, MultiSink,
    TracingAuditSink, TransactionRecord,
};
pub use biometric::{BiometricScanner, SimulatedScanner};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AtmConfig;
pub use console::Console;
pub use credentials::CredentialStore;
pub use currency::ExchangeTable;
pub use error::{AtmError, AtmResult, ErrorCategory};
pub use limits::{DailyLimitEntry, DailyLimitLedger};
pub use lockout::LockoutPolicy;
pub use otp::{OtpCodeGenerator, OtpNotifier, OtpService, RandomCodeGenerator};
pub use session::{SessionClock, SessionState};
pub use types::*;
