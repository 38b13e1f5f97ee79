use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example, due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
    /// A file changed size between being stat'ed and being read.
    ConcurrentModification,
    /// Walking an input directory failed or hit an unsupported entry.
    Traversal,
    /// An archive could not be built from the input files.
    ArchiveWrite,
    /// An archive is malformed or contains an entry that cannot be extracted.
    ArchiveRead,
    /// The encryption capability failed to produce ciphertext.
    Encryption,
    /// The decryption capability refused or failed to open the ciphertext.
    Decryption,
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption.
    AuthenticationFailed,
    /// Ciphertext length fields or binary layout are invalid.
    BinaryFormat,
    /// Input data ended before the expected component could be read.
    TruncatedInput,
    /// Additional bytes were present after the sealed payload.
    TrailingData,
    /// A user-supplied salt does not match the expected length.
    InvalidSalt,
    /// Low-level scrypt key derivation failed.
    ScryptFailure,
    /// NaCl secretbox (XSalsa20Poly1305) failed to seal data.
    SecretboxFailure,
    /// Password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// A command-line input is of the wrong type (e.g. a directory where a
    /// file is required).
    InvalidInput,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct FilecryptError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl FilecryptError {
    /// Creates a new error tagged with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Like [`with_context`](Self::with_context), but re-tags the wrapper
    /// with `kind`. The original kind stays reachable through the source.
    pub fn retag(self, kind: ErrorKind, msg: impl Into<String>) -> Self {
        let category = self.category;
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// Renders the message followed by every message in the source chain,
    /// separated by `": "`.
    pub fn chain_message(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FilecryptError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = FilecryptError::with_kind(ErrorCategory::User, ErrorKind::InvalidSalt, "bad salt")
            .with_context("failed to build encrypter");
        assert_eq!(err.kind, Some(ErrorKind::InvalidSalt));
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.message(), "failed to build encrypter");
        assert!(err.source_error().is_some());
    }

    #[test]
    fn test_retag_keeps_original_as_source() {
        let inner = FilecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "bad password",
        );
        let err = inner.retag(ErrorKind::Decryption, "decryption failed");
        assert_eq!(err.kind, Some(ErrorKind::Decryption));

        let source = err
            .source_error()
            .and_then(|s| s.downcast_ref::<FilecryptError>())
            .expect("source should be a FilecryptError");
        assert_eq!(source.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_chain_message() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to open a.txt",
            io_err,
        )
        .with_context("encryption aborted");
        assert_eq!(
            err.chain_message(),
            "encryption aborted: failed to open a.txt: no such file"
        );
    }
}
