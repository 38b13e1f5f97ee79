//! Password acquisition

use crate::error::{ErrorCategory, ErrorKind, FilecryptError, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Prompt written to standard error before reading from the terminal.
const PROMPT: &[u8] = b"Enter Password: ";

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password, as given with `--password`.
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads a password from any io::Read source until end of input.
///
/// A single trailing `\n` (or `\r\n`) is stripped so that
/// `echo secret | fencrypt --password-stdin ...` uses `secret`.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads a password from the terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read password from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 passwords, use --password-stdin instead.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(FilecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot prompt for password - stdin is not a terminal; \
                 use --password or --password-stdin",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(PROMPT)
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                FilecryptError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        // Read password *without echo*
        let passphrase = rpassword::read_password().map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

/// Pick the reader matching the command-line flags: an explicit password
/// wins, then stdin, then an interactive terminal prompt.
///
/// An empty explicit password counts as no password at all.
pub fn reader_for(password: Option<String>, use_stdin: bool) -> Box<dyn PassphraseReader> {
    match password.filter(|p| !p.is_empty()) {
        Some(password) => Box::new(ConstantPassphraseReader::new(password.into_bytes())),
        None if use_stdin => Box::new(ReaderPassphraseReader::new(Box::new(io::stdin()))),
        None => Box::new(TerminalPassphraseReader::new()),
    }
}
