//! Biometric scanner collaborator
//!
//! The core only sees `scan() -> bool`. [`SimulatedScanner`] stands in for
//! the hardware: each read captures the presented finger cleanly with a
//! fixed probability and matches it against its copy of the enrolment.

use rand::Rng;

use crate::credentials::CredentialStore;

/// External fingerprint scanner
pub trait BiometricScanner: Send {
    /// Perform one scan; `true` when the finger matches the enrolment
    fn scan(&mut self) -> bool;
}

/// Stochastic stand-in for a fingerprint reader
pub struct SimulatedScanner<R> {
    rng: R,
    success_rate: f64,
    enrolled: CredentialStore,
    finger: String,
}

impl<R: Rng + Send> SimulatedScanner<R> {
    /// `success_rate` is clamped to `[0, 1]`
    pub fn new(rng: R, success_rate: f64, enrolled: &CredentialStore, finger: impl Into<String>) -> Self {
        Self {
            rng,
            success_rate: success_rate.clamp(0.0, 1.0),
            enrolled: enrolled.clone(),
            finger: finger.into(),
        }
    }
}

impl<R: Rng + Send> BiometricScanner for SimulatedScanner<R> {
    fn scan(&mut self) -> bool {
        let capture = if self.rng.gen_bool(self.success_rate) {
            self.finger.clone()
        } else {
            // Partial read
            format!("{}~smudged", self.finger)
        };
        self.enrolled.verify_biometric(&capture)
    }
}
