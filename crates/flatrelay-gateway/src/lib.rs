// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness endpoint for hosting platforms that probe an HTTP port.

pub mod server;

pub use server::{router, serve};
