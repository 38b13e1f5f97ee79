//! fdecrypt - restore the content of a file written by fencrypt
//!
//! The decrypted archive is extracted into the output directory.

use clap::Parser;
use std::path::PathBuf;

use filecrypt::cli::normalize_args;
use filecrypt::error::{ErrorCategory, ErrorKind, FilecryptError, Result};
use filecrypt::logger;
use filecrypt::passphrase;
use filecrypt::pipeline::TransferRequest;
use filecrypt::secretcrypt::SecretboxDecrypter;

/// Options also accepted with a single leading dash.
const LONG_FLAGS: &[&str] = &["password", "password-stdin"];

#[derive(Parser)]
#[command(name = "fdecrypt")]
#[command(version)]
#[command(about = "Decrypt a file written by fencrypt into a directory.", long_about = None)]
struct Cli {
    /// Decryption password, instead of prompting on the terminal
    #[arg(short, long, conflicts_with = "password_stdin")]
    password: Option<String>,

    /// Read the password from stdin instead of from the terminal
    #[arg(long)]
    password_stdin: bool,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Encrypted file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory to extract the decrypted content into
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os(), LONG_FLAGS));

    if let Err(e) = logger::init("fdecrypt", cli.verbose) {
        logger::fatal_error(&e);
    }

    if let Err(e) = run(cli) {
        logger::fatal_error(&e);
    }

    log::info!("Done");
}

fn run(cli: Cli) -> Result<()> {
    let request = TransferRequest::new(cli.input, cli.output, false);
    if request.check_input()?.is_dir() {
        return Err(FilecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidInput,
            "can't decrypt folders; input must point to a file",
        ));
    }

    let mut reader = passphrase::reader_for(cli.password, cli.password_stdin);
    let password = reader.read_passphrase()?;
    let decrypter = SecretboxDecrypter::new(&password)?;

    request.decrypt(&decrypter)
}
