//! fencrypt - encrypt a file or directory into a single file
//!
//! The input is packaged into a zip archive, optionally compressed, and
//! sealed with a key derived from a password.

use clap::Parser;
use std::path::PathBuf;

use filecrypt::cli::normalize_args;
use filecrypt::error::Result;
use filecrypt::logger;
use filecrypt::passphrase;
use filecrypt::pipeline::TransferRequest;
use filecrypt::secretcrypt::{Salt, SecretboxEncrypter};

/// Options also accepted with a single leading dash.
const LONG_FLAGS: &[&str] = &["password", "password-stdin", "salt"];

#[derive(Parser)]
#[command(name = "fencrypt")]
#[command(version)]
#[command(about = "Encrypt a file or directory with a password.", long_about = None)]
struct Cli {
    /// Compress the content before encrypting it
    #[arg(short, long)]
    compress: bool,

    /// Encryption password, instead of prompting on the terminal
    #[arg(short, long, conflicts_with = "password_stdin")]
    password: Option<String>,

    /// Read the password from stdin instead of from the terminal
    #[arg(long)]
    password_stdin: bool,

    /// Custom password salt of exactly 8 bytes; freshly generated if omitted
    #[arg(short, long)]
    salt: Option<String>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// File or directory to encrypt
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// File to write the encrypted content to
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os(), LONG_FLAGS));

    if let Err(e) = logger::init("fencrypt", cli.verbose) {
        logger::fatal_error(&e);
    }

    if let Err(e) = run(cli) {
        logger::fatal_error(&e);
    }

    log::info!("Done");
}

fn run(cli: Cli) -> Result<()> {
    let request = TransferRequest::new(cli.input, cli.output, cli.compress);
    request.check_input()?;

    let salt = match cli.salt {
        Some(salt) => Salt::from_bytes(salt.as_bytes())?,
        None => Salt::generate(),
    };

    let mut reader = passphrase::reader_for(cli.password, cli.password_stdin);
    let password = reader.read_passphrase()?;
    let encrypter = SecretboxEncrypter::new(&password, salt)?;

    request.encrypt(&encrypter)
}
