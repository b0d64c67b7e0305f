//! Terminal collaborators
//!
//! [`TerminalConsole`] prompts through `dialoguer` when a user is attached
//! and falls back to plain stdin lines otherwise (pipes, `--plain`).
//! [`SmsNotifier`] prints the OTP in place of a text message.

use std::io::{self, BufRead, Write};

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};

use atm_core::{Console, OtpNotifier};

use crate::display;

/// Console backed by the process terminal
pub struct TerminalConsole {
    interactive: bool,
    theme: ColorfulTheme,
}

impl TerminalConsole {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive,
            theme: ColorfulTheme::default(),
        }
    }

    fn read_plain(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.read_plain(prompt);
        }

        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(prompt_text(prompt))
            .allow_empty(true)
            .interact_text()
            .map_err(to_io)?;
        Ok(Some(answer))
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.read_plain(prompt);
        }

        let answer = Password::with_theme(&self.theme)
            .with_prompt(prompt_text(prompt))
            .allow_empty_password(true)
            .interact()
            .map_err(to_io)?;
        Ok(Some(answer))
    }

    fn write_line(&mut self, text: &str) {
        display::info(text);
    }
}

/// dialoguer adds its own separator after the prompt
fn prompt_text(prompt: &str) -> &str {
    prompt.trim_end_matches(|c: char| c == ':' || c.is_whitespace())
}

fn to_io(err: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

/// Prints the code to the terminal as a stand-in for an SMS gateway
#[derive(Debug, Default)]
pub struct SmsNotifier;

impl OtpNotifier for SmsNotifier {
    fn deliver(&mut self, code: &str, valid_for: chrono::Duration) {
        display::info(&format!(
            "Simulated SMS: Your OTP is {} (valid for {} seconds)",
            code,
            valid_for.num_seconds()
        ));
    }
}
