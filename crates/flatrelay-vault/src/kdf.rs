// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation for passphrase-configured vaults.

use flatrelay_core::RelayError;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Minimum accepted salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Generate a random 16-byte salt.
pub fn generate_salt() -> Result<[u8; MIN_SALT_LEN], RelayError> {
    let mut salt = [0u8; MIN_SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| RelayError::Vault("failed to generate salt".to_string()))?;
    Ok(salt)
}

/// Derive a 32-byte key from `passphrase` and `salt` with Argon2id v0x13.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<Zeroizing<[u8; 32]>, RelayError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(RelayError::Vault(format!(
            "salt must be at least {MIN_SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(32))
        .map_err(|e| RelayError::Vault(format!("invalid Argon2id parameters: {e}")))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| RelayError::Vault(format!("Argon2id key derivation failed: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let salt = [7u8; 16];
        let a = derive_key(b"passphrase", &salt, 32768, 2, 1).unwrap();
        let b = derive_key(b"passphrase", &salt, 32768, 2, 1).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn salt_changes_the_key() {
        let a = derive_key(b"passphrase", &[1u8; 16], 32768, 2, 1).unwrap();
        let b = derive_key(b"passphrase", &[2u8; 16], 32768, 2, 1).unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn short_salt_is_rejected() {
        assert!(derive_key(b"passphrase", &[1u8; 4], 32768, 2, 1).is_err());
    }
}
