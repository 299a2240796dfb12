// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential cipher backing [`CredentialVault`].
//!
//! Sealed credentials are `base64(nonce || ciphertext || tag)`, so records
//! stay plain text in both the JSON and SQLite stores.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flatrelay_config::model::VaultConfig;
use flatrelay_core::{CredentialVault, RelayError, SealedCredential};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{crypto, kdf};

/// Symmetric cipher holding the credential key in memory.
pub struct CredentialCipher {
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Builds the cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(encoded: &str) -> Result<Self, RelayError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| RelayError::Vault(format!("vault key is not valid base64: {e}")))?,
        );
        let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            RelayError::Vault(format!("vault key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_key(key))
    }

    /// Builds the cipher from whichever key source the configuration names.
    pub fn from_config(config: &VaultConfig) -> Result<Self, RelayError> {
        if let Some(key) = &config.key {
            debug!("using configured vault key");
            return Self::from_base64_key(key);
        }
        let Some(passphrase) = &config.passphrase else {
            return Err(RelayError::Vault(
                "no vault key configured: set vault.key or vault.passphrase".to_string(),
            ));
        };
        let salt = config
            .salt
            .as_deref()
            .ok_or_else(|| RelayError::Vault("vault.passphrase requires vault.salt".to_string()))?;
        let salt = STANDARD
            .decode(salt.trim())
            .map_err(|e| RelayError::Vault(format!("vault salt is not valid base64: {e}")))?;

        debug!(
            memory_cost = config.kdf_memory_cost,
            iterations = config.kdf_iterations,
            "deriving vault key from passphrase"
        );
        let key = kdf::derive_key(
            passphrase.as_bytes(),
            &salt,
            config.kdf_memory_cost,
            config.kdf_iterations,
            config.kdf_parallelism,
        )?;
        Ok(Self { key })
    }
}

impl CredentialVault for CredentialCipher {
    fn seal(&self, token: &SecretString) -> Result<SealedCredential, RelayError> {
        let sealed = crypto::seal(&self.key, token.expose_secret().as_bytes())?;
        Ok(SealedCredential(STANDARD.encode(sealed)))
    }

    fn open(&self, sealed: &SealedCredential) -> Result<SecretString, RelayError> {
        let raw = STANDARD
            .decode(sealed.0.as_bytes())
            .map_err(|e| RelayError::Vault(format!("sealed credential is not valid base64: {e}")))?;
        let plaintext = Zeroizing::new(crypto::open(&self.key, &raw)?);
        let token = String::from_utf8(plaintext.to_vec())
            .map_err(|_| RelayError::Vault("credential is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(token))
    }
}

/// Generates a fresh base64 key for `vault.key`.
pub fn generate_key() -> Result<String, RelayError> {
    let key = Zeroizing::new(crypto::generate_random_key()?);
    Ok(STANDARD.encode(key.as_slice()))
}

/// Generates a fresh base64 salt for `vault.salt`.
pub fn generate_salt() -> Result<String, RelayError> {
    Ok(STANDARD.encode(kdf::generate_salt()?))
}
