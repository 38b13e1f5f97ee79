//! Whole-file read and write helpers
//!
//! Inputs and outputs are buffered entirely in memory. Reads verify that the
//! file did not change size while being read, since nothing here holds an
//! OS-level lock on the file.

use crate::error::{ErrorCategory, ErrorKind, FilecryptError, Result};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Read the full content of the file at `path`.
///
/// The file is sized with a stat after opening, exactly that many bytes are
/// read, and then one more byte is attempted. Anything but a clean
/// end-of-file at that point means the file was modified concurrently and
/// fails with [`ErrorKind::ConcurrentModification`].
pub fn read_whole_file(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to stat {}", path.display()),
                e,
            )
        })?
        .len();

    read_exact_size(file, size)
        .map_err(|e| e.with_context(format!("failed to read {}", path.display())))
}

/// Read exactly `size` bytes from `reader` and confirm it is then exhausted.
pub(crate) fn read_exact_size<R: Read>(mut reader: R, size: u64) -> Result<Vec<u8>> {
    let len = usize::try_from(size).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "file too large to hold in memory",
            e,
        )
    })?;

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            concurrent_modification("shorter than expected", None)
        } else {
            FilecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "read failed",
                e,
            )
        }
    })?;

    let mut extra = [0u8; 1];
    loop {
        match reader.read(&mut extra) {
            Ok(0) => return Ok(buffer),
            Ok(_) => return Err(concurrent_modification("larger than expected", None)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(concurrent_modification("unexpected error", Some(e))),
        }
    }
}

fn concurrent_modification(detail: &str, source: Option<io::Error>) -> FilecryptError {
    let msg = format!("file change detected during read ({})", detail);
    match source {
        Some(e) => FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ConcurrentModification,
            msg,
            e,
        ),
        None => {
            FilecryptError::with_kind(ErrorCategory::User, ErrorKind::ConcurrentModification, msg)
        }
    }
}

/// Create the file at `path`, truncating it if it already exists, along
/// with any missing parent directories.
///
/// New files are created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn create_file_truncate(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to create directory {}", parent.display()),
                e,
            )
        })?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to open {}", path.display()),
            e,
        )
    })
}

/// Write `contents` to `path`, replacing whatever was there.
///
/// Missing parent directories are created. A failure part way through leaves
/// the destination truncated or partially written; nothing is rolled back.
pub fn write_whole_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = create_file_truncate(path)?;
    file.write_all(contents).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to write {}", path.display()),
            e,
        )
    })?;
    file.flush().map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to flush {}", path.display()),
            e,
        )
    })
}

fn open_error(path: &Path, err: io::Error) -> FilecryptError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    FilecryptError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to open {}", path.display()),
        err,
    )
}
