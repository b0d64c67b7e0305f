//! Terminal rendering
//!
//! Everything the user sees goes through here; audit output goes to the log
//! file instead.

use colored::*;

use atm_core::TransactionRecord;

use crate::menu::MenuChoice;

const WIDTH: usize = 44;

/// How a status line is marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Info,
    Warning,
}

impl Tone {
    fn mark(&self) -> ColoredString {
        match self {
            Tone::Success => "✓".bright_green(),
            Tone::Error => "✗".bright_red(),
            Tone::Info => "→".bright_blue(),
            Tone::Warning => "⚠".yellow(),
        }
    }

    fn paint(&self, message: &str) -> ColoredString {
        match self {
            Tone::Error => message.bright_red(),
            Tone::Warning => message.yellow(),
            Tone::Success | Tone::Info => message.normal(),
        }
    }
}

/// One indented, marked status line
pub fn status_line(tone: Tone, message: &str) -> String {
    format!("  {} {}", tone.mark(), tone.paint(message))
}

pub fn notify(tone: Tone, message: &str) {
    println!("{}", status_line(tone, message));
}

pub fn success(message: &str) {
    notify(Tone::Success, message);
}

pub fn error(message: &str) {
    notify(Tone::Error, message);
}

pub fn info(message: &str) {
    notify(Tone::Info, message);
}

pub fn warning(message: &str) {
    notify(Tone::Warning, message);
}

/// Print the welcome banner
pub fn banner() {
    let border = "═".repeat(WIDTH - 2);
    println!();
    println!("{}", format!("╔{}╗", border).bright_cyan());
    println!(
        "{}{}{}",
        "║  ".bright_cyan(),
        format!("{:<width$}", "Welcome to the ATM", width = WIDTH - 4).bright_white().bold(),
        "║".bright_cyan()
    );
    println!(
        "{}",
        format!("║  {:<width$}║", "PIN · OTP · fingerprint required", width = WIDTH - 4).bright_cyan()
    );
    println!("{}", format!("╚{}╝", border).bright_cyan());
    println!();
}

/// Print a titled rule
pub fn heading(title: &str) {
    let rule = "─".repeat(WIDTH).bright_black();
    println!();
    println!("{}", rule);
    println!(" {}", title.bright_white().bold());
    println!("{}", rule);
}

/// Print the main menu
pub fn menu() {
    heading("ATM Menu");
    for (index, choice) in MenuChoice::ALL.iter().enumerate() {
        println!("  {} {}", format!("{}.", index + 1).bright_cyan(), choice.label());
    }
}

/// Print an amount with its label, e.g. the balance after a deposit
pub fn amount(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value.bright_cyan().bold());
}

/// Print the transaction history, oldest first
pub fn history(records: &[TransactionRecord], base: &str) {
    if records.is_empty() {
        info("No transactions found.");
        return;
    }

    heading(&format!("Transaction History ({})", base));
    for record in records {
        println!("  {} {}", format!("#{:<3}", record.sequence).bright_black(), record);
    }
}
