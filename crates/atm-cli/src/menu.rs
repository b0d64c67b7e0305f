//! Menu loop
//!
//! Maps menu choices onto account operations. The loop ends on exit, on a
//! terminal error (lock, timeout, closed input) and whenever the step-up
//! authentication in front of a sensitive operation fails.

use rust_decimal::Decimal;

use atm_core::{format_money, parse_amount, Account, AtmError, AtmResult, Console, ExchangeTable};

use crate::display;

/// Entries of the main menu, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CheckBalance,
    Deposit,
    Withdraw,
    ChangePin,
    ViewHistory,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 6] = [
        MenuChoice::CheckBalance,
        MenuChoice::Deposit,
        MenuChoice::Withdraw,
        MenuChoice::ChangePin,
        MenuChoice::ViewHistory,
        MenuChoice::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckBalance => "Check Balance",
            Self::Deposit => "Deposit",
            Self::Withdraw => "Withdraw",
            Self::ChangePin => "Change PIN",
            Self::ViewHistory => "View Transaction History",
            Self::Exit => "Exit",
        }
    }

    /// Parse the 1-based option number
    pub fn parse(input: &str) -> Option<Self> {
        let index: usize = input.trim().parse().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

/// Amounts typed and shown in the selected currency
pub struct Money<'a> {
    table: &'a ExchangeTable,
    currency: String,
}

impl<'a> Money<'a> {
    pub fn new(table: &'a ExchangeTable, currency: &str) -> AtmResult<Self> {
        let currency = table.resolve(currency)?.to_string();
        Ok(Self { table, currency })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Currency the account is kept in
    pub fn base(&self) -> &str {
        self.table.base()
    }

    /// Render a base amount in the selected currency
    pub fn show(&self, base_amount: Decimal) -> String {
        if self.currency == self.table.base() {
            return format!("{} {}", format_money(base_amount), self.currency);
        }
        match self.table.from_base(base_amount, &self.currency) {
            Ok(converted) => format!(
                "{} {} ({} {})",
                format_money(converted),
                self.currency,
                format_money(base_amount),
                self.table.base()
            ),
            Err(_) => format!("{} {}", format_money(base_amount), self.table.base()),
        }
    }

    /// Parse a typed amount and convert it to the base currency
    ///
    /// Base-currency input is passed through unrounded so the account can
    /// reject fractions of a cent.
    pub fn parse(&self, input: &str) -> AtmResult<Decimal> {
        let amount = parse_amount(input)?;
        if self.currency == self.table.base() {
            return Ok(amount);
        }
        self.table.to_base(amount, &self.currency)
    }
}

enum Flow {
    Continue,
    End,
}

/// Serve menu requests until the session ends
pub fn run_session(account: &mut Account, console: &mut dyn Console, money: &Money) {
    loop {
        display::menu();
        let input = match console.read_line("Select an option (1-6): ") {
            Ok(Some(input)) => input,
            Ok(None) => {
                account.logout();
                return;
            }
            Err(err) => {
                display::error(&err.to_string());
                account.logout();
                return;
            }
        };

        let outcome = match MenuChoice::parse(&input) {
            Some(choice) => perform(choice, account, console, money),
            None => account.reject_menu_option(input.trim()).map(|()| {
                display::warning("Invalid option. Please try again.");
                Flow::Continue
            }),
        };

        match outcome {
            Ok(Flow::Continue) => {}
            Ok(Flow::End) => return,
            Err(err) => {
                display::error(&err.to_string());
                if err.is_terminal() {
                    return;
                }
            }
        }
    }
}

fn perform(
    choice: MenuChoice,
    account: &mut Account,
    console: &mut dyn Console,
    money: &Money,
) -> AtmResult<Flow> {
    match choice {
        MenuChoice::CheckBalance => {
            let balance = account.check_balance()?;
            display::amount("Current balance", &money.show(balance));
        }
        MenuChoice::Deposit | MenuChoice::Withdraw => {
            account.ensure_active()?;
            let verb = if choice == MenuChoice::Deposit { "deposit" } else { "withdraw" };
            let input = read(console, &format!("Enter amount to {} ({}): ", verb, money.currency()))?;
            let amount = money.parse(&input).map_err(|err| {
                tracing::warn!(operation = verb, input = %input.trim(), "Invalid amount input");
                err
            })?;

            let record = if choice == MenuChoice::Deposit {
                account.deposit(amount)?
            } else {
                account.withdraw(amount)?
            };
            display::success(&format!("{} of {} successful.", record.kind, money.show(amount)));
            display::amount("Current balance", &money.show(record.balance));
        }
        MenuChoice::ChangePin => {
            display::info("MFA required to change PIN.");
            if let Err(err) = account.step_up(console) {
                display::error(&err.to_string());
                return Ok(Flow::End);
            }
            let new_pin = read_secret(console, "Enter new 4-digit PIN: ")?;
            account.change_pin(&new_pin)?;
            display::success("PIN changed successfully.");
        }
        MenuChoice::ViewHistory => {
            display::info("MFA required to view transaction history.");
            if let Err(err) = account.step_up(console) {
                display::error(&err.to_string());
                return Ok(Flow::End);
            }
            let records = account.view_history()?;
            display::history(records, money.base());
        }
        MenuChoice::Exit => {
            account.logout();
            display::success("Thank you for using the ATM. Goodbye!");
            return Ok(Flow::End);
        }
    }
    Ok(Flow::Continue)
}

/// Offer the admin unlock after authentication hit a locked account
///
/// Returns whether the account was unlocked.
pub fn offer_unlock(account: &mut Account, console: &mut dyn Console) -> bool {
    display::warning("Account is locked. Contact the bank to reset.");
    let code = match console.read_secret("Enter admin unlock code (leave blank to exit): ") {
        Ok(Some(code)) if !code.trim().is_empty() => code,
        _ => return false,
    };

    match account.unlock_account(&code) {
        Ok(()) => {
            display::success("Account unlocked successfully.");
            true
        }
        Err(err) => {
            display::error(&err.to_string());
            false
        }
    }
}

fn read(console: &mut dyn Console, prompt: &str) -> AtmResult<String> {
    console.read_line(prompt)?.ok_or(AtmError::InputClosed)
}

fn read_secret(console: &mut dyn Console, prompt: &str) -> AtmResult<String> {
    console.read_secret(prompt)?.ok_or(AtmError::InputClosed)
}
