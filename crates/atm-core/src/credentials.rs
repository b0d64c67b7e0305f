//! Credential Store
//!
//! Holds the PIN digest and the enrolled biometric-template digest. Plain
//! values are never stored; comparisons run over digests in constant time.
//!
//! The digest is a single SHA-256 pass: this is a simulation, not a key
//! management scheme.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{AtmError, AtmResult};

/// PIN and biometric digests for the single account
#[derive(Clone)]
pub struct CredentialStore {
    pin_digest: String,
    biometric_digest: String,
}

impl CredentialStore {
    /// Create a store from plain enrolment values
    pub fn new(pin: &str, biometric_template: &str) -> Self {
        Self {
            pin_digest: digest(pin),
            biometric_digest: digest(biometric_template),
        }
    }

    /// Check an entered PIN against the stored digest
    pub fn verify_pin(&self, entered: &str) -> bool {
        constant_time_compare(&digest(entered), &self.pin_digest)
    }

    /// Check a captured template against the enrolled digest
    pub fn verify_biometric(&self, template: &str) -> bool {
        constant_time_compare(&digest(template), &self.biometric_digest)
    }

    /// Replace the PIN; the new value must be exactly four digits
    pub fn set_pin(&mut self, new_pin: &str) -> AtmResult<()> {
        if !is_valid_pin(new_pin) {
            return Err(AtmError::InvalidPinFormat);
        }
        self.pin_digest = digest(new_pin);
        Ok(())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

/// A PIN is exactly four ASCII digits
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.chars().all(|c| c.is_ascii_digit())
}

/// One-way hex digest of a secret
fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Constant-time string comparison
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_pin() {
        let store = CredentialStore::new("1234", "fingerprint123");
        assert!(store.verify_pin("1234"));
        assert!(!store.verify_pin("4321"));
        assert!(!store.verify_pin(""));
    }

    #[test]
    fn test_verify_biometric() {
        let store = CredentialStore::new("1234", "fingerprint123");
        assert!(store.verify_biometric("fingerprint123"));
        assert!(!store.verify_biometric("fingerprint124"));
    }

    #[test]
    fn test_set_pin() {
        let mut store = CredentialStore::new("1234", "fingerprint123");

        store.set_pin("9876").unwrap();
        assert!(store.verify_pin("9876"));
        assert!(!store.verify_pin("1234"));
    }

    #[test]
    fn test_set_pin_rejects_bad_format() {
        let mut store = CredentialStore::new("1234", "fingerprint123");

        for bad in ["123", "12345", "12a4", "", " 123"] {
            assert!(matches!(store.set_pin(bad), Err(AtmError::InvalidPinFormat)));
        }
        // Unchanged after rejection
        assert!(store.verify_pin("1234"));
    }

    #[test]
    fn test_debug_hides_digests() {
        let store = CredentialStore::new("1234", "fingerprint123");
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains(&digest("1234")));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }
}
