// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] draws a fresh random 96-bit nonce from the system
//! CSPRNG. Nonce reuse would break GCM.

use flatrelay_core::RelayError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

fn key(bytes: &[u8; 32]) -> Result<LessSafeKey, RelayError> {
    UnboundKey::new(&AES_256_GCM, bytes)
        .map(LessSafeKey::new)
        .map_err(|_| RelayError::Vault("failed to create AES-256-GCM key".to_string()))
}

/// Encrypts `plaintext`, returning `nonce || ciphertext || tag`.
pub fn seal(key_bytes: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, RelayError> {
    let key = key(key_bytes)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| RelayError::Vault("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| RelayError::Vault("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

/// Decrypts the output of [`seal`]. Fails on a wrong key or tampered data.
pub fn open(key_bytes: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, RelayError> {
    if sealed.len() < NONCE_LEN {
        return Err(RelayError::Vault("sealed credential is truncated".to_string()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| RelayError::Vault("invalid nonce".to_string()))?;

    let key = key(key_bytes)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            RelayError::Vault("AES-256-GCM decryption failed -- wrong key or corrupted data".to_string())
        })?;
    Ok(plaintext.to_vec())
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], RelayError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| RelayError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, b"personal token").unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), b"personal token");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = generate_random_key().unwrap();
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&generate_random_key().unwrap(), b"secret").unwrap();
        assert!(open(&generate_random_key().unwrap(), &sealed).is_err());
    }

    #[test]
    fn tampering_is_detected() {
        let key = generate_random_key().unwrap();
        let mut sealed = seal(&key, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let key = generate_random_key().unwrap();
        assert!(open(&key, &[0u8; 4]).is_err());
    }
}
