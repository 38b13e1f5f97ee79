//! Password-based encryption using scrypt + XSalsa20Poly1305
//!
//! This module provides the encryption capability consumed by the
//! [`pipeline`](crate::pipeline) pipeline:
//! - scrypt for key derivation from a password and salt
//! - NaCl secretbox (XSalsa20Poly1305) for authenticated encryption
//!
//! The binary format is self-describing, so decryption needs only the
//! password:
//! - salt: 8 bytes
//! - nonce: 24 bytes
//! - length: 8 bytes (big-endian signed int64)
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)

use std::fmt;
use std::mem::size_of;

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, FilecryptError, Result};

/// Length of salt in bytes
pub const SALT_LEN: usize = 8;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
const KEY_LEN: usize = 32;

/// scrypt N parameter (CPU/memory cost)
const SCRYPT_N: u32 = 32768;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// Produces ciphertext from a plaintext payload.
pub trait Encrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
}

/// Recovers a plaintext payload from ciphertext.
///
/// Implementations must fail closed: a ciphertext that does not
/// authenticate is an error, never garbage output.
pub trait Decrypter {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Key derivation salt. Not secret; it is stored in the clear at the start
/// of every ciphertext.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the operating system RNG.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Use caller-supplied salt bytes, which must be exactly [`SALT_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let salt: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            FilecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidSalt,
                format!("salt must be exactly {} bytes, got {}", SALT_LEN, bytes.len()),
            )
        })?;
        Ok(Self(salt))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(")?;
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Derive a 32-byte key from a password and salt using scrypt
fn derive_key(password: &[u8], salt: &Salt) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(
        SCRYPT_N.ilog2() as u8, // log_n
        SCRYPT_R,
        SCRYPT_P,
        KEY_LEN,
    )
    .map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(password, salt.as_bytes(), &params, key.as_mut()).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(key)
}

/// Encrypts with a key derived once, at construction, from a password and salt.
pub struct SecretboxEncrypter {
    salt: Salt,
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl SecretboxEncrypter {
    pub fn new(password: &[u8], salt: Salt) -> Result<Self> {
        let key = derive_key(password, &salt)?;
        Ok(Self { salt, key })
    }

    /// Encrypt with a caller-provided nonce.
    ///
    /// This is ONLY for producing deterministic output in tests. Reusing a
    /// nonce with the same key breaks confidentiality; [`Encrypter::encrypt`]
    /// always draws a fresh one.
    pub fn encrypt_with_nonce(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Vec<u8>> {
        let cipher = XSalsa20Poly1305::new(&(*self.key).into());

        let nonce_obj = Nonce::from(*nonce);
        let sealed_box = cipher.encrypt(&nonce_obj, plaintext).map_err(|e| {
            FilecryptError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                format!("secretbox seal failed: {}", e),
            )
        })?;

        let sealed_box_len = sealed_box.len() as i64;
        let mut output =
            Vec::with_capacity(SALT_LEN + NONCE_LEN + size_of::<i64>() + sealed_box.len());
        output.extend_from_slice(self.salt.as_bytes());
        output.extend_from_slice(nonce);
        output.extend_from_slice(&sealed_box_len.to_be_bytes()); // big-endian i64
        output.extend_from_slice(&sealed_box);

        Ok(output)
    }
}

impl Encrypter for SecretboxEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        self.encrypt_with_nonce(plaintext, &nonce)
    }
}

/// Decrypts ciphertext produced by [`SecretboxEncrypter`], deriving the key
/// from the salt embedded in each ciphertext.
pub struct SecretboxDecrypter {
    password: Zeroizing<Vec<u8>>,
}

impl SecretboxDecrypter {
    pub fn new(password: &[u8]) -> Result<Self> {
        Ok(Self {
            password: Zeroizing::new(password.to_vec()),
        })
    }
}

fn format_error(kind: ErrorKind, msg: &str) -> FilecryptError {
    FilecryptError::with_kind(ErrorCategory::User, kind, msg)
}

impl Decrypter for SecretboxDecrypter {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let mut pos = 0;

        if ciphertext.len() < pos + SALT_LEN {
            return Err(format_error(
                ErrorKind::TruncatedInput,
                "input likely truncated while reading salt",
            ));
        }
        let salt = Salt::from_bytes(&ciphertext[pos..pos + SALT_LEN])?;
        pos += SALT_LEN;

        if ciphertext.len() < pos + NONCE_LEN {
            return Err(format_error(
                ErrorKind::TruncatedInput,
                "input likely truncated while reading nonce",
            ));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&ciphertext[pos..pos + NONCE_LEN]);
        pos += NONCE_LEN;

        if ciphertext.len() < pos + size_of::<i64>() {
            return Err(format_error(
                ErrorKind::TruncatedInput,
                "input likely truncated while reading sealed box",
            ));
        }
        let mut length_bytes = [0u8; 8];
        length_bytes.copy_from_slice(&ciphertext[pos..pos + size_of::<i64>()]);
        let sealed_box_len = i64::from_be_bytes(length_bytes);
        pos += size_of::<i64>();

        if sealed_box_len < 0 {
            return Err(format_error(
                ErrorKind::BinaryFormat,
                "negative sealed box length (when interpreted as a big-endian i64)",
            ));
        }

        // *Valid* input can fail this check if the platform's isize is small.
        if sealed_box_len > isize::MAX as i64 {
            return Err(format_error(
                ErrorKind::BinaryFormat,
                "sealed box length exceeds this system's max isize",
            ));
        }

        let sealed_box_len = sealed_box_len as usize;

        if ciphertext.len() - pos < sealed_box_len {
            return Err(format_error(
                ErrorKind::TruncatedInput,
                "truncated or corrupt input; claimed length greater than available input",
            ));
        }
        let sealed_box = &ciphertext[pos..pos + sealed_box_len];
        pos += sealed_box_len;

        if pos < ciphertext.len() {
            return Err(format_error(
                ErrorKind::TrailingData,
                "invalid input: unexpected data after sealed box",
            ));
        }

        let key = derive_key(&self.password, &salt)?;
        let cipher = XSalsa20Poly1305::new(&(*key).into());
        let nonce_obj = Nonce::from(nonce);
        cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
            format_error(
                ErrorKind::AuthenticationFailed,
                "corrupt input, tampered-with data, or bad password",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypter(password: &[u8]) -> SecretboxEncrypter {
        SecretboxEncrypter::new(password, Salt::generate()).unwrap()
    }

    fn decrypt(password: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        SecretboxDecrypter::new(password).unwrap().decrypt(ciphertext)
    }

    #[test]
    fn test_empty_plaintext() {
        let ciphertext = encrypter(b"test").encrypt(b"").unwrap();
        let decrypted = decrypt(b"test", &ciphertext).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_one_encrypter_many_payloads() {
        let enc = encrypter(b"hello");
        let ct1 = enc.encrypt(b"first").unwrap();
        let ct2 = enc.encrypt(b"first").unwrap();

        // Fresh nonce per call
        assert_ne!(ct1, ct2);
        assert_eq!(ct1[..SALT_LEN], ct2[..SALT_LEN]);

        assert_eq!(decrypt(b"hello", &ct1).unwrap(), b"first");
        assert_eq!(decrypt(b"hello", &ct2).unwrap(), b"first");
    }

    #[test]
    fn test_salt_from_bytes() {
        let salt = Salt::from_bytes(b"12345678").unwrap();
        assert_eq!(salt.as_bytes(), b"12345678");

        let err = Salt::from_bytes(b"short").expect_err("expected invalid salt");
        assert_eq!(err.kind, Some(ErrorKind::InvalidSalt));
        assert_eq!(err.category, ErrorCategory::User);

        let err = Salt::from_bytes(b"much too long salt").expect_err("expected invalid salt");
        assert_eq!(err.kind, Some(ErrorKind::InvalidSalt));
    }

    #[test]
    fn test_user_salt_is_embedded() {
        let salt = Salt::from_bytes(b"saltsalt").unwrap();
        let enc = SecretboxEncrypter::new(b"pw", salt).unwrap();
        let ciphertext = enc.encrypt(b"data").unwrap();
        assert_eq!(&ciphertext[..SALT_LEN], b"saltsalt");
        assert_eq!(decrypt(b"pw", &ciphertext).unwrap(), b"data");
    }

    #[test]
    fn test_wrong_password() {
        let ciphertext = encrypter(b"correct").encrypt(b"secret data").unwrap();
        let err = decrypt(b"wrong", &ciphertext).expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let mut ciphertext = encrypter(b"test").encrypt(b"secret data").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        let err = decrypt(b"test", &ciphertext).expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_truncated_salt() {
        let err = decrypt(b"test", &[1, 2, 3]).expect_err("expected truncation");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
        assert!(err.message().contains("while reading salt"));
    }

    #[test]
    fn test_truncated_nonce() {
        let err = decrypt(b"test", &[0u8; SALT_LEN + 3]).expect_err("expected truncation");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
        assert!(err.message().contains("while reading nonce"));
    }

    #[test]
    fn test_truncated_length() {
        let err =
            decrypt(b"test", &[0u8; SALT_LEN + NONCE_LEN + 3]).expect_err("expected truncation");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
        assert!(err.message().contains("while reading sealed box"));
    }

    #[test]
    fn test_negative_length() {
        let mut ciphertext = vec![0u8; SALT_LEN + NONCE_LEN + 8];
        ciphertext[SALT_LEN + NONCE_LEN..].copy_from_slice(&(-1i64).to_be_bytes());

        let err = decrypt(b"test", &ciphertext).expect_err("expected bad length");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_length_exceeds_available() {
        let mut ciphertext = encrypter(b"test").encrypt(b"hello").unwrap();
        ciphertext[SALT_LEN + NONCE_LEN..SALT_LEN + NONCE_LEN + 8]
            .copy_from_slice(&1_000_000i64.to_be_bytes());

        let err = decrypt(b"test", &ciphertext).expect_err("expected truncation");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
    }

    #[test]
    fn test_trailing_data() {
        let mut ciphertext = encrypter(b"test").encrypt(b"hello").unwrap();
        ciphertext.push(0xFF);

        let err = decrypt(b"test", &ciphertext).expect_err("expected trailing data");
        assert_eq!(err.kind, Some(ErrorKind::TrailingData));
    }

    #[test]
    fn test_all_byte_values() {
        let plaintext: Vec<u8> = (0..=255).collect();
        let ciphertext = encrypter(b"test").encrypt(&plaintext).unwrap();
        assert_eq!(decrypt(b"test", &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_known_answer() {
        // Fixed salt and nonce pin the wire format byte-for-byte.
        let salt = Salt::from_bytes(&[0x42u8; SALT_LEN]).unwrap();
        let nonce = [0x24u8; NONCE_LEN];
        let enc = SecretboxEncrypter::new(b"test", salt).unwrap();

        let ciphertext = enc.encrypt_with_nonce(b"test payload", &nonce).unwrap();

        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42,
            0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24,
            0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24,
            0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24, 0x24,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1c,
            0x44, 0x87, 0xfe, 0xcd, 0x6f, 0xcf, 0x10, 0x75,
            0x7b, 0x4c, 0xb9, 0xc6, 0x59, 0xda, 0x83, 0x61,
            0x28, 0xfc, 0xf4, 0x30, 0x39, 0x85, 0x4a, 0x66,
            0xcf, 0xb5, 0xcf, 0xd4,
        ];
        assert_eq!(ciphertext, expected);

        assert_eq!(decrypt(b"test", &ciphertext).unwrap(), b"test payload");
    }
}
