//! OTP (One-Time Passcode) Service
//!
//! Issues and checks single-use numeric challenges:
//! - Uniformly random codes of a fixed number of digits
//! - Validity window measured from issuance on the injected clock
//! - At most one live challenge; issuing again discards the previous one
//! - Out-of-band delivery through an [`OtpNotifier`]
//!
//! Attempt budgets are not tracked here; the account owns them.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::credentials::constant_time_compare;

/// Source of OTP codes
pub trait OtpCodeGenerator: Send {
    /// Produce a code of exactly `digits` digits
    fn generate(&mut self, digits: u32) -> String;
}

/// Uniform random codes in `[10^(digits-1), 10^digits - 1]`
pub struct RandomCodeGenerator<R> {
    rng: R,
}

impl<R: Rng + Send> RandomCodeGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> OtpCodeGenerator for RandomCodeGenerator<R> {
    fn generate(&mut self, digits: u32) -> String {
        let low = 10u64.pow(digits.saturating_sub(1));
        let high = 10u64.pow(digits) - 1;
        self.rng.gen_range(low..=high).to_string()
    }
}

/// Out-of-band delivery of a code (SMS in the reference ATM)
pub trait OtpNotifier: Send {
    fn deliver(&mut self, code: &str, valid_for: Duration);
}

/// A live challenge
#[derive(Clone)]
struct OtpChallenge {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Outcome of checking an entered code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Code matched; the challenge has been consumed
    Accepted,
    /// Code did not match; the challenge stays live
    Rejected,
    /// No live challenge, or its window has passed
    Expired,
}

/// OTP service
pub struct OtpService {
    generator: Box<dyn OtpCodeGenerator>,
    notifier: Box<dyn OtpNotifier>,
    digits: u32,
    validity: Duration,
    challenge: Option<OtpChallenge>,
}

impl OtpService {
    /// Create a new OTP service
    pub fn new(
        generator: Box<dyn OtpCodeGenerator>,
        notifier: Box<dyn OtpNotifier>,
        digits: u32,
        validity: Duration,
    ) -> Self {
        Self {
            generator,
            notifier,
            digits,
            validity,
            challenge: None,
        }
    }

    /// Issue a fresh challenge and deliver it; returns its expiry
    pub fn issue(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let code = self.generator.generate(self.digits);
        let expires_at = now + self.validity;

        self.notifier.deliver(&code, self.validity);
        self.challenge = Some(OtpChallenge { code, expires_at });

        expires_at
    }

    /// Check an entered code against the live challenge
    ///
    /// A code entered exactly at the expiry instant is still accepted.
    pub fn verify(&mut self, entered: &str, now: DateTime<Utc>) -> OtpCheck {
        let Some(challenge) = self.challenge.as_ref() else {
            return OtpCheck::Expired;
        };

        if now > challenge.expires_at {
            self.challenge = None;
            return OtpCheck::Expired;
        }

        if constant_time_compare(entered.trim(), &challenge.code) {
            self.challenge = None;
            OtpCheck::Accepted
        } else {
            OtpCheck::Rejected
        }
    }

    /// Drop any live challenge
    pub fn clear(&mut self) {
        self.challenge = None;
    }

    /// Whether a challenge is live at `now`
    pub fn has_live_challenge(&self, now: DateTime<Utc>) -> bool {
        self.challenge
            .as_ref()
            .map(|c| now <= c.expires_at)
            .unwrap_or(false)
    }

    /// Validity window of new challenges
    pub fn validity(&self) -> Duration {
        self.validity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedCodeGenerator, RecordingNotifier};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
    }

    fn service(codes: &[&str]) -> (OtpService, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let service = OtpService::new(
            Box::new(FixedCodeGenerator::new(codes)),
            Box::new(notifier.clone()),
            6,
            Duration::seconds(30),
        );
        (service, notifier)
    }

    #[test]
    fn test_random_codes_have_six_digits() {
        let mut generator = RandomCodeGenerator::new(StdRng::seed_from_u64(11));
        for _ in 0..200 {
            let code = generator.generate(6);
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn test_issue_delivers_code() {
        let (mut service, notifier) = service(&["482913"]);
        let expires_at = service.issue(start());

        assert_eq!(expires_at, start() + Duration::seconds(30));
        assert_eq!(notifier.delivered(), vec!["482913".to_string()]);
    }

    #[test]
    fn test_verify_within_window() {
        let (mut service, _) = service(&["482913"]);
        service.issue(start());

        assert_eq!(
            service.verify("482913", start() + Duration::seconds(30)),
            OtpCheck::Accepted
        );
        // Single use
        assert_eq!(service.verify("482913", start()), OtpCheck::Expired);
    }

    #[test]
    fn test_verify_after_window() {
        let (mut service, _) = service(&["482913"]);
        service.issue(start());

        assert_eq!(
            service.verify("482913", start() + Duration::seconds(31)),
            OtpCheck::Expired
        );
    }

    #[test]
    fn test_mismatch_keeps_challenge() {
        let (mut service, _) = service(&["482913"]);
        service.issue(start());

        assert_eq!(service.verify("000000", start()), OtpCheck::Rejected);
        assert!(service.has_live_challenge(start()));
        assert_eq!(service.verify("482913", start()), OtpCheck::Accepted);
    }

    #[test]
    fn test_reissue_discards_previous() {
        let (mut service, _) = service(&["111111", "222222"]);
        service.issue(start());
        service.issue(start());

        assert_eq!(service.verify("111111", start()), OtpCheck::Rejected);
        assert_eq!(service.verify("222222", start()), OtpCheck::Accepted);
    }

    #[test]
    fn test_no_challenge_is_expired() {
        let (mut service, _) = service(&["482913"]);
        assert_eq!(service.verify("482913", start()), OtpCheck::Expired);
    }
}
