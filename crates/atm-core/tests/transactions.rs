use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use atm_core::testing::{ScriptedConsole, TestRig};
use atm_core::{
    Account, AtmConfig, AtmError, AuditEventKind, ErrorCategory, LimitKind, TransactionKind,
};

fn sign_in(rig: &TestRig, config: &AtmConfig) -> Account {
    let mut account = rig.account(config, &["482913"]);
    rig.scanner.push(true);
    let mut console = ScriptedConsole::new(&["1234", "482913"]);
    account.authenticate(&mut console).unwrap();
    account
}

fn step_up(rig: &TestRig, account: &mut Account) {
    rig.scanner.push(true);
    let mut console = ScriptedConsole::new(&["1234", "482913"]);
    account.step_up(&mut console).unwrap();
}

#[test]
fn test_deposit_scenario() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    let record = account.deposit(dec!(500.00)).unwrap();

    assert_eq!(account.balance(), dec!(1500.00));
    assert_eq!(account.daily_limit(LimitKind::Deposit).used, dec!(500.00));
    assert_eq!(account.trail().len(), 1);
    assert_eq!(record.kind, TransactionKind::Deposit);
    assert_eq!(record.amount, Some(dec!(500.00)));
    assert_eq!(record.balance, dec!(1500.00));
    assert_eq!(&account.trail().records()[0], &record);
}

#[test]
fn test_withdraw_more_than_balance() {
    let rig = TestRig::new();
    let mut config = AtmConfig::default();
    config.limits.daily_withdrawal = dec!(2000);
    let mut account = sign_in(&rig, &config);

    let err = account.withdraw(dec!(1200.00)).unwrap_err();

    assert!(matches!(err, AtmError::InsufficientFunds { .. }));
    assert_eq!(err.error_code(), "insufficient_funds");
    assert_eq!(err.category(), ErrorCategory::Policy);
    assert_eq!(account.balance(), dec!(1000.00));
    assert_eq!(account.daily_limit(LimitKind::Withdrawal).used, dec!(0));
    assert!(account.trail().is_empty());
}

#[test]
fn test_withdraw_over_limit_reports_limit_first() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    let err = account.withdraw(dec!(1200.00)).unwrap_err();
    assert_eq!(err.error_code(), "limit_exceeded");
    assert_eq!(
        rig.audit
            .count(|k| matches!(k, AuditEventKind::LimitExceeded { .. })),
        1
    );
}

#[test]
fn test_non_positive_amounts() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    for amount in [dec!(0), dec!(-5)] {
        let err = account.deposit(amount).unwrap_err();
        assert_eq!(err.error_code(), "invalid_amount");
        let err = account.withdraw(amount).unwrap_err();
        assert_eq!(err.error_code(), "invalid_amount");
    }
    assert_eq!(account.balance(), dec!(1000));
    assert!(account.trail().is_empty());
}

#[test]
fn test_sub_cent_amounts_are_rejected() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    let err = account.deposit(dec!(0.001)).unwrap_err();
    assert_eq!(err.error_code(), "invalid_amount");
    let err = account.withdraw(dec!(10.005)).unwrap_err();
    assert_eq!(err.error_code(), "invalid_amount");

    // Trailing zeros are still whole cents
    account.deposit(dec!(10.500)).unwrap();
    assert_eq!(account.balance(), dec!(1010.50));
    assert_eq!(account.trail().len(), 1);
}

#[test]
fn test_huge_amount_after_deposit_is_rejected() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());
    account.deposit(dec!(500)).unwrap();

    let amount = atm_core::parse_amount("79228162514264337593543950335").unwrap();
    assert_eq!(amount, Decimal::MAX);

    let err = account.deposit(amount).unwrap_err();
    assert_eq!(err.error_code(), "limit_exceeded");
    let err = account.withdraw(amount).unwrap_err();
    assert_eq!(err.error_code(), "limit_exceeded");

    assert_eq!(account.balance(), dec!(1500));
    assert_eq!(account.daily_limit(LimitKind::Deposit).used, dec!(500));
    assert_eq!(account.trail().len(), 1);
}

#[test]
fn test_balance_overflow_is_rejected() {
    let rig = TestRig::new();
    let mut config = AtmConfig::default();
    config.account.initial_balance = Decimal::MAX;
    let mut account = sign_in(&rig, &config);

    let err = account.deposit(dec!(1)).unwrap_err();
    assert_eq!(err.error_code(), "amount_out_of_range");
    assert_eq!(account.balance(), Decimal::MAX);
    assert_eq!(account.daily_limit(LimitKind::Deposit).used, dec!(0));
    assert!(account.trail().is_empty());
}

#[test]
fn test_withdrawals_accumulate_against_limit() {
    let rig = TestRig::new();
    let mut config = AtmConfig::default();
    config.account.initial_balance = dec!(5000);
    let mut account = sign_in(&rig, &config);

    account.withdraw(dec!(600)).unwrap();
    account.withdraw(dec!(400)).unwrap();
    let err = account.withdraw(dec!(0.01)).unwrap_err();

    match err {
        AtmError::LimitExceeded {
            kind,
            limit,
            used,
            requested,
        } => {
            assert_eq!(kind, LimitKind::Withdrawal);
            assert_eq!(limit, dec!(1000));
            assert_eq!(used, dec!(1000));
            assert_eq!(requested, dec!(0.01));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(account.balance(), dec!(4000));
}

#[test]
fn test_limits_roll_over_at_midnight() {
    let rig = TestRig::starting_at(Utc.with_ymd_and_hms(2026, 6, 15, 23, 59, 30).unwrap());
    let mut config = AtmConfig::default();
    config.account.initial_balance = dec!(5000);
    let mut account = sign_in(&rig, &config);

    account.withdraw(dec!(600)).unwrap();
    assert!(account.withdraw(dec!(600)).is_err());

    rig.clock.advance(Duration::seconds(40));
    account.withdraw(dec!(600)).unwrap();

    let entry = account.daily_limit(LimitKind::Withdrawal);
    assert_eq!(entry.used, dec!(600));
    assert_eq!(entry.date, chrono::NaiveDate::from_ymd_opt(2026, 6, 16).unwrap());
    assert_eq!(account.balance(), dec!(3800));
    assert_eq!(
        rig.audit
            .count(|k| matches!(k, AuditEventKind::DailyLimitsReset { .. })),
        1
    );
}

#[test]
fn test_balance_check_is_recorded() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    assert_eq!(account.check_balance().unwrap(), dec!(1000));
    let record = &account.trail().records()[0];
    assert_eq!(record.kind, TransactionKind::BalanceCheck);
    assert_eq!(record.amount, None);
}

#[test]
fn test_sliding_session_window() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    for _ in 0..5 {
        rig.clock.advance(Duration::seconds(55));
        account.check_balance().unwrap();
    }
    assert_eq!(account.trail().len(), 5);
}

#[test]
fn test_change_pin_requires_step_up() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    let err = account.change_pin("4321").unwrap_err();
    assert!(matches!(err, AtmError::StepUpRequired));
    assert_eq!(err.category(), ErrorCategory::Session);

    step_up(&rig, &mut account);
    account.change_pin("4321").unwrap();

    let record = account.trail().records().last().unwrap();
    assert_eq!(record.kind, TransactionKind::PinChange);

    // Old PIN is gone
    account.logout();
    let mut console = ScriptedConsole::new(&["1234", "4321", "482913"]);
    rig.scanner.push(true);
    account.authenticate(&mut console).unwrap();
    assert!(console.output().iter().any(|l| l.contains("Invalid PIN")));
}

#[test]
fn test_change_pin_rejects_bad_format() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    for bad in ["123", "12345", "12a4", ""] {
        step_up(&rig, &mut account);
        let err = account.change_pin(bad).unwrap_err();
        assert!(matches!(err, AtmError::InvalidPinFormat));
    }
    assert!(account.trail().is_empty());

    // Still the old PIN
    step_up(&rig, &mut account);
}

#[test]
fn test_view_history() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    step_up(&rig, &mut account);
    assert!(account.view_history().unwrap().is_empty());

    account.deposit(dec!(250)).unwrap();
    account.withdraw(dec!(100)).unwrap();
    account.check_balance().unwrap();

    step_up(&rig, &mut account);
    let history = account.view_history().unwrap();
    let kinds: Vec<TransactionKind> = history.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::BalanceCheck
        ]
    );
    assert_eq!(history[2].balance, dec!(1150));
    assert!(account.trail().verify_chain());
}

#[test]
fn test_rejections_are_audited() {
    let rig = TestRig::new();
    let mut account = sign_in(&rig, &AtmConfig::default());

    account.withdraw(dec!(5000)).unwrap_err();
    account.deposit(dec!(-1)).unwrap_err();

    let rejected: Vec<String> = rig
        .audit
        .events()
        .into_iter()
        .filter_map(|e| match e.kind {
            AuditEventKind::TransactionRejected { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(rejected, vec!["limit_exceeded", "invalid_amount"]);
}

proptest! {
    #[test]
    fn prop_no_partial_application(cents in prop::collection::vec(1i64..300_000, 1..20)) {
        let rig = TestRig::new();
        let mut account = sign_in(&rig, &AtmConfig::default());

        let mut expected_balance = dec!(1000);
        let mut expected_used = Decimal::ZERO;

        for c in cents {
            let amount = Decimal::new(c, 2);
            let before_len = account.trail().len();

            match account.deposit(amount) {
                Ok(record) => {
                    expected_balance += amount;
                    expected_used += amount;
                    prop_assert_eq!(record.balance, expected_balance);
                    prop_assert_eq!(account.trail().len(), before_len + 1);
                }
                Err(err) => {
                    prop_assert_eq!(err.error_code(), "limit_exceeded");
                    prop_assert!(expected_used + amount > dec!(5000));
                    prop_assert_eq!(account.trail().len(), before_len);
                }
            }

            prop_assert_eq!(account.balance(), expected_balance);
            prop_assert_eq!(account.daily_limit(LimitKind::Deposit).used, expected_used);
            prop_assert!(expected_used <= dec!(5000));
        }
        prop_assert!(account.trail().verify_chain());
    }

    #[test]
    fn prop_withdrawal_never_overdraws(cents in prop::collection::vec(1i64..80_000, 1..20)) {
        let rig = TestRig::new();
        let mut account = sign_in(&rig, &AtmConfig::default());

        for c in cents {
            let amount = Decimal::new(c, 2);
            let before = account.balance();
            match account.withdraw(amount) {
                Ok(_) => prop_assert_eq!(account.balance(), before - amount),
                Err(_) => prop_assert_eq!(account.balance(), before),
            }
            prop_assert!(account.balance() >= Decimal::ZERO);
            prop_assert!(account.daily_limit(LimitKind::Withdrawal).used <= dec!(1000));
        }
    }
}
