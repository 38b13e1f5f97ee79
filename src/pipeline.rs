//! File and directory encryption pipeline
//!
//! This module provides the high-level operations used by the command-line
//! tools. Inputs are packaged into a zip archive, the archive bytes are
//! encrypted as a single payload, and the ciphertext is written verbatim to
//! the output file. Decryption reverses the steps into an output directory.
//!
//! Every invocation is linear with no retries. On failure the output file
//! or directory may be left partially written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::{ErrorCategory, ErrorKind, FilecryptError, Result};
use crate::file_ops;
use crate::secretcrypt::{Decrypter, Encrypter};

/// One input to output transformation, as requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Deflate archive members instead of storing them. Ignored when decrypting.
    pub compress: bool,
}

impl TransferRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            compress,
        }
    }

    /// Stat the input, failing with [`ErrorKind::Io`] if it is unreadable.
    pub fn check_input(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.input).map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to stat {}", self.input.display()),
                e,
            )
        })
    }

    /// Encrypt the input file or directory into the output file.
    pub fn encrypt(&self, encrypter: &dyn Encrypter) -> Result<()> {
        if self.check_input()?.is_dir() {
            log::info!("Encrypting directory '{}'...", self.input.display());
            encrypt_dir(&self.input, &self.output, encrypter, self.compress)
        } else {
            log::info!("Encrypting file '{}'...", self.input.display());
            encrypt_file(&self.input, &self.output, encrypter, self.compress)
        }
    }

    /// Decrypt the input file into the output directory.
    pub fn decrypt(&self, decrypter: &dyn Decrypter) -> Result<()> {
        if self.check_input()?.is_dir() {
            return Err(FilecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                "can't decrypt folders; input must point to a file",
            ));
        }

        log::info!("Decrypting file '{}'...", self.input.display());
        decrypt_file(&self.input, &self.output, decrypter)
    }
}

/// Encrypt the single file at `plain_path` into `cipher_path`.
///
/// The file is archived under its base name, so decrypting into a directory
/// recreates it there. An existing `cipher_path` is overwritten and missing
/// parent directories are created.
pub fn encrypt_file(
    plain_path: &Path,
    cipher_path: &Path,
    encrypter: &dyn Encrypter,
    compress: bool,
) -> Result<()> {
    let root = plain_path.parent().unwrap_or(Path::new(""));
    encrypt_to_file(root, &[plain_path.to_path_buf()], cipher_path, encrypter, compress)
}

/// Encrypt every file below `dir_path` into `cipher_path`.
///
/// Paths are stored relative to `dir_path`, so the directory itself is not
/// part of the extracted tree.
pub fn encrypt_dir(
    dir_path: &Path,
    cipher_path: &Path,
    encrypter: &dyn Encrypter,
    compress: bool,
) -> Result<()> {
    let files = archive::collect_files(dir_path)?;
    encrypt_to_file(dir_path, &files, cipher_path, encrypter, compress)
}

/// Archive `files` relative to `root`, encrypt the archive and write it to
/// `cipher_path`.
pub fn encrypt_to_file(
    root: &Path,
    files: &[PathBuf],
    cipher_path: &Path,
    encrypter: &dyn Encrypter,
    compress: bool,
) -> Result<()> {
    let payload = archive::build_archive(root, files, compress)?;
    log::info!(
        "Packaged {} file(s) into a {} byte archive",
        files.len(),
        payload.len()
    );

    let ciphertext = encrypter
        .encrypt(&payload)
        .map_err(|e| e.retag(ErrorKind::Encryption, "encryption failed"))?;

    file_ops::write_whole_file(cipher_path, &ciphertext)
        .map_err(|e| e.with_context(format!("failed to write to {}", cipher_path.display())))
}

/// Decrypt the file at `cipher_path` and extract its content below
/// `output_dir`.
///
/// Nothing is written when decryption fails.
pub fn decrypt_file(
    cipher_path: &Path,
    output_dir: &Path,
    decrypter: &dyn Decrypter,
) -> Result<()> {
    let ciphertext = file_ops::read_whole_file(cipher_path)?;

    let payload = decrypter
        .decrypt(&ciphertext)
        .map_err(|e| e.retag(ErrorKind::Decryption, "failed to decrypt"))?;

    archive::extract_archive(&payload, output_dir)
        .map_err(|e| e.with_context(format!("failed to extract into {}", output_dir.display())))
}
