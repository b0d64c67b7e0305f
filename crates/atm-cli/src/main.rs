//! ATM simulator
//!
//! Interactive single-account ATM: PIN, OTP and fingerprint authentication,
//! then a menu of balance checks, deposits, withdrawals, PIN changes and
//! history views. Audit events go to a log file so the terminal stays clean.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (PIN 1234, balance 1000.00 USD)
//! atm
//!
//! # Reproducible OTP codes and fingerprint scans
//! atm --seed 42
//!
//! # Show and enter amounts in another currency
//! atm --currency TZS
//!
//! # Scripted input
//! printf '1234\n...' | atm --plain
//!
//! # Environment overrides
//! ATM__LIMITS__DAILY_WITHDRAWAL=500 atm
//! ```

mod config;
mod console;
mod display;
mod menu;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use atm_core::{
    Account, Collaborators, CredentialStore, ExchangeTable, RandomCodeGenerator, SimulatedScanner,
    SystemClock, TracingAuditSink,
};

use crate::config::{CliConfig, LoggingConfig};
use crate::console::{SmsNotifier, TerminalConsole};
use crate::menu::Money;

// =============================================================================
// CLI Arguments
// =============================================================================

/// ATM simulator with multi-factor authentication
#[derive(Parser, Debug)]
#[command(name = "atm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "ATM_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ATM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, compact, pretty)
    #[arg(long, env = "ATM_LOG_FORMAT")]
    log_format: Option<String>,

    /// Audit log file
    #[arg(long, env = "ATM_LOG_FILE")]
    log_file: Option<String>,

    /// Currency used to show and enter amounts
    #[arg(long, env = "ATM_CURRENCY")]
    currency: Option<String>,

    /// Seed for OTP codes and fingerprint scans
    #[arg(long, env = "ATM_SEED")]
    seed: Option<u64>,

    /// Read plain lines from stdin instead of interactive prompts
    #[arg(long)]
    plain: bool,
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cli_config = CliConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(level) = args.log_level {
        cli_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        cli_config.logging.format = format;
    }
    if let Some(file) = args.log_file {
        cli_config.logging.file = file.into();
    }

    if let Err(errors) = cli_config.atm.validate() {
        anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    init_logging(&cli_config.logging)?;

    let table = ExchangeTable::new(&cli_config.atm.currency);
    let currency = args.currency.unwrap_or_else(|| table.base().to_string());
    let money = Money::new(&table, &currency)?;

    let mut account = open_account(&cli_config, args.seed);
    let mut console = TerminalConsole::new(!args.plain && ::console::user_attended());

    tracing::info!(
        seed = ?args.seed,
        currency = money.currency(),
        log_file = %cli_config.logging.file.display(),
        "ATM started"
    );

    display::banner();

    loop {
        match account.authenticate(&mut console) {
            Ok(()) => {
                display::success("Authentication successful.");
                menu::run_session(&mut account, &mut console, &money);
                break;
            }
            Err(err) => {
                display::error(&err.to_string());
                if account.is_locked() && menu::offer_unlock(&mut account, &mut console) {
                    continue;
                }
                break;
            }
        }
    }

    tracing::info!("ATM stopped");
    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging to the audit log file
fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("Failed to open log file {}", config.file.display()))?;
    let writer = Mutex::new(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        "compact" => {
            subscriber
                .with(
                    fmt::layer()
                        .compact()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(writer),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .pretty()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(writer),
                )
                .init();
        }
    }

    Ok(())
}

/// Wire the account to the terminal, the system clock and the simulators
fn open_account(cli_config: &CliConfig, seed: Option<u64>) -> Account {
    let config = &cli_config.atm;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let otp_rng = StdRng::seed_from_u64(rng.gen());
    let scanner_rng = StdRng::seed_from_u64(rng.gen());

    // The scanner keeps its own copy of the enrolment it matches against
    let enrolment = CredentialStore::new(
        &config.account.default_pin,
        &config.account.biometric_template,
    );
    let scanner = SimulatedScanner::new(
        scanner_rng,
        config.security.biometric_success_rate,
        &enrolment,
        config.account.biometric_template.clone(),
    );

    Account::new(
        config,
        Collaborators {
            clock: Box::new(SystemClock),
            otp_generator: Box::new(RandomCodeGenerator::new(otp_rng)),
            otp_notifier: Box::new(SmsNotifier),
            scanner: Box::new(scanner),
            audit: Box::new(TracingAuditSink),
        },
    )
}
