// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque credential encryption capability.

use secrecy::SecretString;

use crate::error::RelayError;
use crate::record::SealedCredential;

pub trait CredentialVault: Send + Sync + 'static {
    /// Encrypts a plaintext feed token for storage.
    fn seal(&self, token: &SecretString) -> Result<SealedCredential, RelayError>;

    /// Decrypts a stored credential for one outbound call.
    fn open(&self, sealed: &SealedCredential) -> Result<SecretString, RelayError>;
}
