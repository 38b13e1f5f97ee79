//! Verbosity-gated logging for the command-line tools
//!
//! Library code logs progress through the `log` facade. The tools stay quiet
//! on success unless `--verbose` is given, while errors are always shown.

use std::fmt::Display;
use std::io::Write;
use std::process;

use log::LevelFilter;

use crate::error::{ErrorCategory, FilecryptError, Result};

/// Exit status used for every fatal error.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Level that lets through progress messages only when `verbose` is set.
/// Errors pass at every level.
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    }
}

/// Install the global logger, writing `<program> <time> <message>` lines to
/// standard error.
pub fn init(program: &str, verbose: bool) -> Result<()> {
    let program = program.to_string();
    env_logger::Builder::new()
        .filter_level(level_for(verbose))
        .target(env_logger::Target::Stderr)
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                program,
                buf.timestamp_seconds(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| {
            FilecryptError::with_source(ErrorCategory::Internal, "failed to install logger", e)
        })
}

/// Log `err` regardless of verbosity and terminate the process.
pub fn fatal(err: impl Display) -> ! {
    log::error!("{}", err);
    // The logger may not be installed yet if initialization itself failed.
    if log::max_level() < LevelFilter::Error {
        eprintln!("{}", err);
    }
    process::exit(FATAL_EXIT_CODE)
}

/// Like [`fatal`], but renders the full source chain of a crate error.
pub fn fatal_error(err: &FilecryptError) -> ! {
    fatal(err.chain_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_quiet_unless_verbose() {
        let quiet = level_for(false);
        assert!(Level::Error <= quiet);
        assert!(Level::Warn > quiet);
        assert!(Level::Info > quiet);

        let verbose = level_for(true);
        assert!(Level::Error <= verbose);
        assert!(Level::Info <= verbose);
        assert!(Level::Debug > verbose);
    }
}
