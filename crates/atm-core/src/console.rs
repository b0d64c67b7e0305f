//! Console collaborator
//!
//! Line-oriented input and output used by the MFA pipeline to prompt for
//! credentials. `Ok(None)` from a read means the input source is closed.

use std::io;

/// Interactive prompt
pub trait Console {
    /// Show `prompt` and read one line, without the trailing newline
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Read a value that must not be echoed (PIN, OTP)
    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.read_line(prompt)
    }

    fn write_line(&mut self, text: &str);
}
