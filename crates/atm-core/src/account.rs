//! Account orchestrator
//!
//! Owns the balance and composes the credential store, verifier services,
//! lockout policy, session clock, daily limit ledger and audit trail.
//!
//! # MFA pipeline
//!
//! PIN, then OTP, then biometric. Each stage must succeed before the next
//! one is offered. A wrong value decrements that factor's budget and may be
//! retried while budget remains; an exhausted budget locks the account. The
//! stages can be driven one at a time ([`Account::verify_pin`],
//! [`Account::verify_otp`], [`Account::verify_biometric`]) or end to end
//! through a [`Console`] ([`Account::authenticate`], [`Account::step_up`]).
//!
//! # Transactions
//!
//! Every operation inside a session first checks the idle timeout, then
//! refreshes the activity timestamp and rolls the daily limits over if the
//! calendar date changed. Money movements check the daily limit (and the
//! balance for withdrawals) before anything is mutated, so a rejected
//! transaction leaves no trace apart from its audit event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::audit::{AuditEvent, AuditEventKind, AuditLevel, AuditSink, AuditTrail, TransactionRecord};
use crate::biometric::BiometricScanner;
use crate::clock::Clock;
use crate::config::AtmConfig;
use crate::console::Console;
use crate::credentials::{constant_time_compare, CredentialStore};
use crate::error::{AtmError, AtmResult};
use crate::limits::{DailyLimitEntry, DailyLimitLedger};
use crate::lockout::{FailureOutcome, LockoutPolicy};
use crate::otp::{OtpCheck, OtpCodeGenerator, OtpNotifier, OtpService};
use crate::session::{SessionClock, SessionState};
use crate::types::{format_money, Factor, LimitKind, TransactionKind};

/// Why an MFA run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaPurpose {
    /// Open a session
    Login,
    /// Re-verify inside an open session before a sensitive operation
    StepUp,
}

/// Pipeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MfaStage {
    Idle,
    AwaitingOtp(MfaPurpose),
    AwaitingBiometric(MfaPurpose),
}

/// External services the account talks to
pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub otp_generator: Box<dyn OtpCodeGenerator>,
    pub otp_notifier: Box<dyn OtpNotifier>,
    pub scanner: Box<dyn BiometricScanner>,
    pub audit: Box<dyn AuditSink>,
}

/// The single simulated account
pub struct Account {
    balance: Decimal,
    credentials: CredentialStore,
    lockout: LockoutPolicy,
    otp: OtpService,
    scanner: Box<dyn BiometricScanner>,
    session: SessionClock,
    limits: DailyLimitLedger,
    trail: AuditTrail,
    stage: MfaStage,
    step_up_granted: bool,
    admin_code: String,
    clock: Box<dyn Clock>,
    audit: Box<dyn AuditSink>,
}

impl Account {
    /// Open the account with the configured balance and credentials
    pub fn new(config: &AtmConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            clock,
            otp_generator,
            otp_notifier,
            scanner,
            audit,
        } = collaborators;

        let now = clock.now();
        let otp = OtpService::new(
            otp_generator,
            otp_notifier,
            config.security.otp_digits,
            to_chrono(config.security.otp_validity),
        );

        let mut account = Self {
            balance: config.account.initial_balance,
            credentials: CredentialStore::new(
                &config.account.default_pin,
                &config.account.biometric_template,
            ),
            lockout: LockoutPolicy::new(config.security.max_attempts),
            otp,
            scanner,
            session: SessionClock::new(to_chrono(config.security.session_timeout), now),
            limits: DailyLimitLedger::new(&config.limits, clock.today()),
            trail: AuditTrail::new(),
            stage: MfaStage::Idle,
            step_up_granted: false,
            admin_code: config.security.admin_code.clone(),
            clock,
            audit,
        };

        let balance = account.balance;
        account.emit(
            AuditLevel::Info,
            AuditEventKind::AccountOpened { balance },
            format!("Account opened with balance {}", format_money(balance)),
        );
        account
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_locked(&self) -> bool {
        self.lockout.is_locked()
    }

    /// Factor whose exhausted budget locked the account
    pub fn locked_by(&self) -> Option<Factor> {
        self.lockout.locked_by()
    }

    pub fn remaining_attempts(&self, factor: Factor) -> u32 {
        self.lockout.remaining(factor)
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn daily_limit(&self, kind: LimitKind) -> &DailyLimitEntry {
        self.limits.entry(kind)
    }

    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }

    /// Whether a fresh MFA run is waiting to be spent
    pub fn has_step_up(&self) -> bool {
        self.step_up_granted
    }

    // =========================================================================
    // MFA pipeline
    // =========================================================================

    /// Run the full MFA pipeline through `console` and open a session
    pub fn authenticate(&mut self, console: &mut dyn Console) -> AtmResult<()> {
        self.run_pipeline(console, MfaPurpose::Login)
    }

    /// Re-run the full MFA pipeline inside the open session
    ///
    /// Grants one use of [`change_pin`](Self::change_pin) or
    /// [`view_history`](Self::view_history).
    pub fn step_up(&mut self, console: &mut dyn Console) -> AtmResult<()> {
        self.check_session()?;
        self.run_pipeline(console, MfaPurpose::StepUp)
    }

    fn run_pipeline(&mut self, console: &mut dyn Console, purpose: MfaPurpose) -> AtmResult<()> {
        let result = self.drive_pipeline(console, purpose);
        if result.is_err() {
            self.abort_pipeline();
        }
        result
    }

    fn drive_pipeline(&mut self, console: &mut dyn Console, purpose: MfaPurpose) -> AtmResult<()> {
        loop {
            let pin = read_secret(console, "Enter your PIN: ")?;
            match self.verify_pin(purpose, &pin) {
                Ok(_) => break,
                Err(err @ AtmError::PinInvalid { .. }) => console.write_line(&err.to_string()),
                Err(err) => return Err(err),
            }
        }

        console.write_line("An OTP has been sent to your registered mobile number.");
        loop {
            let code = read_secret(console, "Enter the OTP: ")?;
            match self.verify_otp(&code) {
                Ok(()) => break,
                Err(err @ AtmError::OtpInvalid { .. }) => console.write_line(&err.to_string()),
                Err(err) => return Err(err),
            }
        }

        loop {
            console.write_line("Place your finger on the scanner...");
            match self.verify_biometric() {
                Ok(()) => return Ok(()),
                Err(err @ AtmError::BiometricFailed { .. }) => console.write_line(&err.to_string()),
                Err(err) => return Err(err),
            }
        }
    }

    /// First stage: check the PIN and, on success, issue an OTP challenge
    ///
    /// Always restarts the pipeline. Returns the expiry of the new challenge.
    pub fn verify_pin(&mut self, purpose: MfaPurpose, entered: &str) -> AtmResult<DateTime<Utc>> {
        self.abort_pipeline();

        if purpose == MfaPurpose::StepUp {
            self.check_session()?;
        }

        if self.lockout.is_locked() {
            self.emit(
                AuditLevel::Warning,
                AuditEventKind::LoginRejectedLocked,
                "Authentication attempted on a locked account",
            );
            return Err(AtmError::AccountLocked);
        }

        if !self.credentials.verify_pin(entered) {
            return Err(self.factor_failed(Factor::Pin));
        }

        self.lockout.record_success(Factor::Pin);
        self.emit(AuditLevel::Info, AuditEventKind::PinVerified, "PIN verification successful");

        let now = self.clock.now();
        let expires_at = self.otp.issue(now);
        self.emit(
            AuditLevel::Info,
            AuditEventKind::OtpIssued { expires_at },
            "OTP generated and sent",
        );

        self.stage = MfaStage::AwaitingOtp(purpose);
        Ok(expires_at)
    }

    /// Second stage: check the OTP against the live challenge
    ///
    /// An expired challenge aborts the pipeline without consuming an attempt.
    pub fn verify_otp(&mut self, entered: &str) -> AtmResult<()> {
        let MfaStage::AwaitingOtp(purpose) = self.stage else {
            return Err(AtmError::OutOfSequence { expected: self.expected_stage() });
        };
        self.recheck_session(purpose)?;

        let now = self.clock.now();
        match self.otp.verify(entered, now) {
            OtpCheck::Accepted => {
                self.lockout.record_success(Factor::Otp);
                self.emit(AuditLevel::Info, AuditEventKind::OtpVerified, "OTP verification successful");
                self.stage = MfaStage::AwaitingBiometric(purpose);
                Ok(())
            }
            OtpCheck::Expired => {
                self.abort_pipeline();
                self.emit(AuditLevel::Warning, AuditEventKind::OtpExpired, "OTP has expired");
                Err(AtmError::OtpExpired)
            }
            OtpCheck::Rejected => Err(self.factor_failed(Factor::Otp)),
        }
    }

    /// Third stage: one fingerprint scan
    ///
    /// Completing this stage opens the session (login) or grants the
    /// step-up.
    pub fn verify_biometric(&mut self) -> AtmResult<()> {
        let MfaStage::AwaitingBiometric(purpose) = self.stage else {
            return Err(AtmError::OutOfSequence { expected: self.expected_stage() });
        };
        self.recheck_session(purpose)?;

        // No scan is spent on an exhausted budget
        if self.lockout.remaining(Factor::Biometric) == 0 {
            self.lockout.lock(Factor::Biometric);
            self.abort_pipeline();
            return Err(AtmError::FactorLocked {
                factor: Factor::Biometric,
            });
        }

        if !self.scanner.scan() {
            return Err(self.factor_failed(Factor::Biometric));
        }

        self.lockout.record_success(Factor::Biometric);
        self.emit(
            AuditLevel::Info,
            AuditEventKind::BiometricVerified,
            "Biometric verification successful",
        );
        self.stage = MfaStage::Idle;

        let now = self.clock.now();
        match purpose {
            MfaPurpose::Login => {
                self.session.start(now);
                self.step_up_granted = false;
                self.emit(AuditLevel::Info, AuditEventKind::Authenticated, "User authenticated");
            }
            MfaPurpose::StepUp => {
                self.session.touch(now);
                self.step_up_granted = true;
                self.emit(
                    AuditLevel::Info,
                    AuditEventKind::StepUpGranted,
                    "Multi-factor re-authentication successful",
                );
            }
        }
        Ok(())
    }

    /// Record a failed factor and build the matching error
    fn factor_failed(&mut self, factor: Factor) -> AtmError {
        match self.lockout.record_failure(factor) {
            FailureOutcome::Retry { remaining } => {
                let (kind, err) = match factor {
                    Factor::Pin => (
                        AuditEventKind::PinRejected { remaining },
                        AtmError::PinInvalid { remaining },
                    ),
                    Factor::Otp => (
                        AuditEventKind::OtpRejected { remaining },
                        AtmError::OtpInvalid { remaining },
                    ),
                    Factor::Biometric => (
                        AuditEventKind::BiometricRejected { remaining },
                        AtmError::BiometricFailed { remaining },
                    ),
                };
                self.emit(
                    AuditLevel::Warning,
                    kind,
                    format!("{} verification failed, {} attempts remaining", factor, remaining),
                );
                err
            }
            FailureOutcome::Locked => {
                self.abort_pipeline();
                self.emit(
                    AuditLevel::Critical,
                    AuditEventKind::AccountLocked { factor },
                    format!("Account locked due to too many failed {} attempts", factor),
                );
                AtmError::FactorLocked { factor }
            }
        }
    }

    /// A step-up must not outlive the session it runs in
    fn recheck_session(&mut self, purpose: MfaPurpose) -> AtmResult<()> {
        if purpose == MfaPurpose::StepUp {
            if let Err(err) = self.check_session() {
                self.abort_pipeline();
                return Err(err);
            }
        }
        Ok(())
    }

    fn abort_pipeline(&mut self) {
        self.stage = MfaStage::Idle;
        self.otp.clear();
    }

    fn expected_stage(&self) -> &'static str {
        match self.stage {
            MfaStage::Idle => "PIN",
            MfaStage::AwaitingOtp(_) => "OTP",
            MfaStage::AwaitingBiometric(_) => "biometric",
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Read the balance; appends a balance-check record
    pub fn check_balance(&mut self) -> AtmResult<Decimal> {
        let now = self.begin_operation()?;
        self.step_up_granted = false;

        let balance = self.balance;
        self.trail.append(now, TransactionKind::BalanceCheck, None, balance);
        self.emit(
            AuditLevel::Info,
            AuditEventKind::TransactionCompleted {
                kind: TransactionKind::BalanceCheck,
                amount: None,
                balance,
            },
            format!("Balance checked: {}", format_money(balance)),
        );
        Ok(balance)
    }

    /// Add money to the account within the daily deposit limit
    pub fn deposit(&mut self, amount: Decimal) -> AtmResult<TransactionRecord> {
        self.move_money(LimitKind::Deposit, amount)
    }

    /// Take money out within the daily withdrawal limit and the balance
    pub fn withdraw(&mut self, amount: Decimal) -> AtmResult<TransactionRecord> {
        self.move_money(LimitKind::Withdrawal, amount)
    }

    fn move_money(&mut self, kind: LimitKind, amount: Decimal) -> AtmResult<TransactionRecord> {
        let now = self.begin_operation()?;
        self.step_up_granted = false;
        let operation = kind.as_str();

        if amount <= Decimal::ZERO || amount.normalize().scale() > 2 {
            return Err(self.reject(operation, AtmError::InvalidAmount { amount }));
        }

        let would_use = match self.limits.check(kind, amount) {
            Ok(would_use) => would_use,
            Err(err) => {
                if let AtmError::LimitExceeded {
                    kind,
                    limit,
                    used,
                    requested,
                } = &err
                {
                    self.emit(
                        AuditLevel::Warning,
                        AuditEventKind::LimitExceeded {
                            kind: *kind,
                            limit: *limit,
                            used: *used,
                            requested: *requested,
                        },
                        format!("Daily {} limit exceeded", kind),
                    );
                }
                return Err(self.reject(operation, err));
            }
        };

        if kind == LimitKind::Withdrawal && amount > self.balance {
            let err = AtmError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            };
            return Err(self.reject(operation, err));
        }

        let balance = match kind {
            LimitKind::Deposit => self.balance.checked_add(amount),
            LimitKind::Withdrawal => self.balance.checked_sub(amount),
        };
        let Some(balance) = balance else {
            return Err(self.reject(operation, AtmError::AmountOutOfRange { amount }));
        };

        self.balance = balance;
        self.limits.commit(kind, would_use);

        let record = self
            .trail
            .append(now, kind.into(), Some(amount), balance)
            .clone();

        self.emit(
            AuditLevel::Info,
            AuditEventKind::TransactionCompleted {
                kind: record.kind,
                amount: Some(amount),
                balance,
            },
            format!(
                "{} of {} successful, new balance {}",
                record.kind,
                format_money(amount),
                format_money(balance)
            ),
        );
        Ok(record)
    }

    /// Replace the PIN; needs a step-up granted by [`step_up`](Self::step_up)
    pub fn change_pin(&mut self, new_pin: &str) -> AtmResult<()> {
        let now = self.begin_operation()?;
        if !std::mem::take(&mut self.step_up_granted) {
            return Err(self.reject("change_pin", AtmError::StepUpRequired));
        }

        if let Err(err) = self.credentials.set_pin(new_pin.trim()) {
            return Err(self.reject("change_pin", err));
        }

        let balance = self.balance;
        self.trail.append(now, TransactionKind::PinChange, None, balance);
        self.emit(
            AuditLevel::Info,
            AuditEventKind::TransactionCompleted {
                kind: TransactionKind::PinChange,
                amount: None,
                balance,
            },
            "PIN changed successfully",
        );
        Ok(())
    }

    /// Transaction history, oldest first; needs a step-up
    ///
    /// An empty slice means there is nothing to show.
    pub fn view_history(&mut self) -> AtmResult<&[TransactionRecord]> {
        self.begin_operation()?;
        if !std::mem::take(&mut self.step_up_granted) {
            return Err(self.reject("view_history", AtmError::StepUpRequired));
        }

        let records = self.trail.len();
        self.emit(
            AuditLevel::Info,
            AuditEventKind::HistoryViewed { records },
            format!("Transaction history viewed ({} records)", records),
        );
        Ok(self.trail.records())
    }

    /// Out-of-band recovery; works regardless of session or lock state
    pub fn unlock_account(&mut self, admin_code: &str) -> AtmResult<()> {
        if !constant_time_compare(admin_code.trim(), &self.admin_code) {
            self.emit(
                AuditLevel::Warning,
                AuditEventKind::AdminUnlockRejected,
                "Admin unlock rejected: invalid admin code",
            );
            return Err(AtmError::InvalidAdminCode);
        }

        self.lockout.reset();
        self.abort_pipeline();
        self.emit(
            AuditLevel::Info,
            AuditEventKind::AdminUnlock,
            "Account unlocked by admin",
        );
        Ok(())
    }

    /// Leave the session
    pub fn logout(&mut self) {
        self.session.end();
        self.step_up_granted = false;
        self.abort_pipeline();
        self.emit(AuditLevel::Info, AuditEventKind::LoggedOut, "User logged out");
    }

    /// Timeout check plus activity refresh, for callers about to prompt
    /// for the details of an operation
    pub fn ensure_active(&mut self) -> AtmResult<()> {
        self.begin_operation().map(|_| ())
    }

    /// Menu choice that maps to no operation; still counts as activity
    pub fn reject_menu_option(&mut self, choice: &str) -> AtmResult<()> {
        self.begin_operation()?;
        self.emit(
            AuditLevel::Warning,
            AuditEventKind::InvalidMenuOption {
                choice: choice.to_string(),
            },
            format!("Invalid menu option selected: {}", choice),
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Session gate shared by every in-session operation
    fn begin_operation(&mut self) -> AtmResult<DateTime<Utc>> {
        let now = self.check_session()?;
        self.session.touch(now);

        let today = self.clock.today();
        if self.limits.roll_over(today) {
            self.emit(
                AuditLevel::Info,
                AuditEventKind::DailyLimitsReset { date: today },
                format!("Daily limits reset for {}", today),
            );
        }
        Ok(now)
    }

    /// Timeout check without refreshing activity
    fn check_session(&mut self) -> AtmResult<DateTime<Utc>> {
        let now = self.clock.now();
        let was_active = self.session.state() == SessionState::Authenticated;

        match self.session.check(now) {
            Ok(()) => Ok(now),
            Err(err) => {
                if let AtmError::SessionTimedOut { idle_secs } = &err {
                    let idle_secs = *idle_secs;
                    if was_active {
                        self.step_up_granted = false;
                        self.emit(
                            AuditLevel::Warning,
                            AuditEventKind::SessionTimedOut { idle_secs },
                            format!("Session timed out after {}s of inactivity", idle_secs),
                        );
                    }
                }
                Err(err)
            }
        }
    }

    fn reject(&mut self, operation: &'static str, err: AtmError) -> AtmError {
        self.emit(
            AuditLevel::Warning,
            AuditEventKind::TransactionRejected {
                operation: operation.to_string(),
                reason: err.error_code().to_string(),
                detail: err.to_string(),
            },
            format!("{} rejected: {}", operation, err),
        );
        err
    }

    fn emit(&mut self, level: AuditLevel, kind: AuditEventKind, message: impl Into<String>) {
        let event = AuditEvent::new(self.clock.now(), level, kind, message);
        self.audit.record(&event);
    }
}

fn read_secret(console: &mut dyn Console, prompt: &str) -> AtmResult<String> {
    console
        .read_secret(prompt)?
        .map(|line| line.trim().to_string())
        .ok_or(AtmError::InputClosed)
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}
