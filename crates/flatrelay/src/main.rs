// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flatrelay - forwards Flat.io notifications to Discord.
//!
//! This is the binary entry point for the relay.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod pump;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flatrelay_config::RelayConfig;
use flatrelay_core::CredentialVault;
use flatrelay_vault::CredentialCipher;
use secrecy::SecretString;

/// Flatrelay - forwards Flat.io notifications to Discord.
#[derive(Parser, Debug)]
#[command(name = "flatrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay.
    Serve,
    /// Validate the configuration and report problems.
    CheckConfig,
    /// Print a fresh base64 key for `vault.key`.
    GenerateKey,
    /// Seal a Flat.io token with the configured vault key.
    EncryptToken {
        /// Plaintext personal access token.
        token: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Key generation needs no configuration.
    if let Some(Commands::GenerateKey) = cli.command {
        match flatrelay_vault::generate_key() {
            Ok(key) => println!("{key}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!(
                "flatrelay: config ok (storage={:?}, gateway={})",
                config.storage.backend,
                if config.gateway.enabled { "on" } else { "off" }
            );
        }
        Some(Commands::EncryptToken { token }) => match seal_token(&config, token) {
            Ok(sealed) => println!("{sealed}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::GenerateKey) => {}
        None => {
            println!("flatrelay: use --help for available commands");
        }
    }
}

/// Loads and validates configuration, exiting with rendered diagnostics on failure.
fn load_config(path: Option<&std::path::Path>) -> RelayConfig {
    let result = match path {
        Some(path) => flatrelay_config::load_and_validate_path(path),
        None => flatrelay_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            flatrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn seal_token(config: &RelayConfig, token: String) -> Result<String, flatrelay_core::RelayError> {
    let cipher = CredentialCipher::from_config(&config.vault)?;
    let sealed = cipher.seal(&SecretString::from(token))?;
    Ok(sealed.0)
}
