//! Filecrypt - password-based encryption of files and directories
//!
//! Inputs are packaged into a zip archive (optionally deflated) and the
//! archive is sealed with scrypt + XSalsa20Poly1305 into a single blob.

#![forbid(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod error;
pub mod file_ops;
pub mod logger;
pub mod passphrase;
pub mod pipeline;
pub mod secretcrypt;
