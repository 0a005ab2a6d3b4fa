//! Encryption of the stored password

use std::fmt;

use base64::engine::{general_purpose::STANDARD, Engine};
use geocollab_tokens::Password;
use ring::{
    aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN},
    digest,
    rand::{SecureRandom, SystemRandom},
};
use thiserror::Error;

/// Secret used when none is configured
///
/// This value is public. Passwords encrypted with it are only obscured.
pub const DEFAULT_SECRET: &str = "A secret not so secret";

/// A password encrypted with a [`PasswordCipher`]
///
/// The encoding is the standard base64 alphabet over the 96-bit nonce
/// followed by the AES-256-GCM ciphertext and tag.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPassword(String);

impl EncryptedPassword {
    /// Wraps a previously encrypted password
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded ciphertext
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("EncryptedPassword(***)")
    }
}

impl From<String> for EncryptedPassword {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

/// A password could not be encrypted or decrypted
#[derive(Debug, Error)]
pub enum CipherError {
    /// The underlying cryptographic operation failed
    ///
    /// For decryption, this usually means the password was encrypted with a
    /// different secret.
    #[error("unable to encrypt or decrypt password")]
    Crypto,
    /// The ciphertext was not valid base64
    #[error("encrypted password is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    /// The ciphertext was too short to hold a nonce and tag
    #[error("encrypted password is truncated")]
    Truncated,
    /// The decrypted password was not valid UTF-8
    #[error("decrypted password is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<ring::error::Unspecified> for CipherError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::Crypto
    }
}

/// Symmetric cipher keeping the user's password encrypted in memory
///
/// The key is the SHA-256 digest of the configured secret. A fresh random
/// nonce is drawn for every encryption.
pub struct PasswordCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for PasswordCipher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PasswordCipher { key }")
    }
}

impl PasswordCipher {
    /// Derives a cipher from `secret`, falling back to [`DEFAULT_SECRET`]
    pub fn new(secret: Option<&str>) -> Result<Self, CipherError> {
        let secret = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "no secret configured, passwords will be encrypted with the default secret"
                );
                DEFAULT_SECRET
            }
        };

        let digest = digest::digest(&digest::SHA256, secret.as_bytes());
        let key = UnboundKey::new(&AES_256_GCM, digest.as_ref())?;

        Ok(Self {
            key: LessSafeKey::new(key),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypts a plaintext password
    pub fn encrypt(&self, password: &str) -> Result<EncryptedPassword, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce)?;

        let mut sealed = password.as_bytes().to_vec();
        self.key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::empty(),
            &mut sealed,
        )?;

        let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);

        Ok(EncryptedPassword(STANDARD.encode(output)))
    }

    /// Decrypts a password produced by [`encrypt()`][Self::encrypt()]
    pub fn decrypt(&self, encrypted: &EncryptedPassword) -> Result<Password, CipherError> {
        let data = STANDARD.decode(&encrypted.0)?;
        if data.len() < NONCE_LEN + aead::MAX_TAG_LEN {
            return Err(CipherError::Truncated);
        }

        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)?;
        let mut sealed = sealed.to_vec();
        let plain = self.key.open_in_place(nonce, Aad::empty(), &mut sealed)?;

        Ok(Password::new(String::from_utf8(plain.to_vec())?))
    }
}
