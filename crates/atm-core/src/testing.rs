//! Deterministic collaborators for tests
//!
//! Every stub is cheap to clone and clones share state, so a test keeps a
//! handle while the [`Account`] owns a boxed copy.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::account::{Account, Collaborators};
use crate::biometric::BiometricScanner;
use crate::config::AtmConfig;
use crate::console::Console;
use crate::otp::{OtpCodeGenerator, OtpNotifier};

pub use crate::audit::MemoryAuditSink;
pub use crate::clock::ManualClock;

/// Console fed from a fixed list of lines
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            inputs: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, line: &str) {
        self.inputs.push_back(line.to_string());
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Lines written so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Lines not consumed yet
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.inputs.pop_front())
    }

    fn write_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

/// Hands out queued codes; repeats the last one when the queue runs dry
#[derive(Debug, Clone, Default)]
pub struct FixedCodeGenerator {
    codes: Arc<Mutex<VecDeque<String>>>,
    last: Arc<Mutex<Option<String>>>,
}

impl FixedCodeGenerator {
    pub fn new(codes: &[&str]) -> Self {
        let generator = Self::default();
        generator.push(codes);
        generator
    }

    pub fn push(&self, codes: &[&str]) {
        self.codes.lock().extend(codes.iter().map(|c| c.to_string()));
    }
}

impl OtpCodeGenerator for FixedCodeGenerator {
    fn generate(&mut self, digits: u32) -> String {
        let mut last = self.last.lock();
        if let Some(code) = self.codes.lock().pop_front() {
            *last = Some(code);
        }
        last.clone().unwrap_or_else(|| "0".repeat(digits as usize))
    }
}

/// Captures every delivered code
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.delivered.lock().last().cloned()
    }
}

impl OtpNotifier for RecordingNotifier {
    fn deliver(&mut self, code: &str, _valid_for: chrono::Duration) {
        self.delivered.lock().push(code.to_string());
    }
}

/// Returns queued scan outcomes; an empty queue reads as a failed scan
#[derive(Debug, Clone, Default)]
pub struct ScriptedScanner {
    outcomes: Arc<Mutex<VecDeque<bool>>>,
    scans: Arc<Mutex<usize>>,
}

impl ScriptedScanner {
    pub fn new(outcomes: &[bool]) -> Self {
        let scanner = Self::default();
        for outcome in outcomes {
            scanner.push(*outcome);
        }
        scanner
    }

    pub fn push(&self, outcome: bool) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Number of scans performed
    pub fn scans(&self) -> usize {
        *self.scans.lock()
    }
}

impl BiometricScanner for ScriptedScanner {
    fn scan(&mut self) -> bool {
        *self.scans.lock() += 1;
        self.outcomes.lock().pop_front().unwrap_or(false)
    }
}

/// Shared handles on every collaborator of one test account
#[derive(Debug, Clone)]
pub struct TestRig {
    pub clock: ManualClock,
    pub codes: FixedCodeGenerator,
    pub notifier: RecordingNotifier,
    pub scanner: ScriptedScanner,
    pub audit: MemoryAuditSink,
}

impl TestRig {
    /// Rig whose clock starts at 2026-06-15 10:00:00 UTC
    pub fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            clock: ManualClock::new(start),
            codes: FixedCodeGenerator::default(),
            notifier: RecordingNotifier::default(),
            scanner: ScriptedScanner::default(),
            audit: MemoryAuditSink::new(),
        }
    }

    /// Queue more OTP codes
    pub fn queue_codes(&self, codes: &[&str]) {
        self.codes.push(codes);
    }

    /// Build an account wired to this rig
    pub fn account(&self, config: &AtmConfig, codes: &[&str]) -> Account {
        self.queue_codes(codes);
        Account::new(
            config,
            Collaborators {
                clock: Box::new(self.clock.clone()),
                otp_generator: Box::new(self.codes.clone()),
                otp_notifier: Box::new(self.notifier.clone()),
                scanner: Box::new(self.scanner.clone()),
                audit: Box::new(self.audit.clone()),
            },
        )
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}
