// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM credential sealing for the Flatrelay notification relay.
//!
//! Feed tokens are only stored sealed. The key comes from configuration,
//! either directly as base64 or derived from a passphrase with Argon2id.

pub mod cipher;
pub mod crypto;
pub mod kdf;

pub use cipher::{generate_key, generate_salt, CredentialCipher};
