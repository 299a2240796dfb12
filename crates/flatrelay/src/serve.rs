// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serve command implementation.
//!
//! Wires the store, registry, feed client, vault and Discord adapter
//! together, runs the startup sequence, then runs the poll loop and the
//! command pump until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use flatrelay_commands::{CommandHandler, CommandSettings};
use flatrelay_config::RelayConfig;
use flatrelay_core::{ChatAdapter, CredentialVault, FeedSource, RelayAdapter, RelayError};
use flatrelay_discord::DiscordChat;
use flatrelay_feed::Fetcher;
use flatrelay_poller::{final_flush, install_signal_handler, Dispatcher, Pacing, Poller};
use flatrelay_registry::{shared, Registry};
use flatrelay_vault::CredentialCipher;
use tracing::{error, info, warn};

use crate::pump::run_pump;

/// Extra time past the confirmation timeout that shutdown waits for commands.
const COMMAND_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs the `flatrelay serve` command.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.relay.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting flatrelay");

    let store = flatrelay_storage::open_store(&config.storage).await?;
    let registry = Registry::load(store.as_ref(), config.poller.cursor_capacity).await?;
    info!(users = registry.len(), backend = ?config.storage.backend, "registry loaded");
    let registry = shared(registry);

    let vault: Arc<dyn CredentialVault> = Arc::new(CredentialCipher::from_config(&config.vault)?);

    let fetcher = Arc::new(Fetcher::new(&config.feed)?);
    let feed: Arc<dyn FeedSource> = fetcher.clone();

    let mut discord = DiscordChat::new(&config.discord)?;
    discord.connect().await?;
    let chat: Arc<dyn ChatAdapter> = Arc::new(discord);
    info!("discord adapter connected");

    // Install signal handler.
    let cancel = install_signal_handler();

    // Spawn feed pool refresh.
    {
        let fetcher = fetcher.clone();
        let period = Duration::from_secs(config.feed.pool_refresh_secs);
        let refresh_cancel = cancel.clone();
        tokio::spawn(async move {
            flatrelay_feed::run_refresh_loop(fetcher, period, refresh_cancel).await;
        });
    }

    spawn_gateway(&config, &cancel);

    let dispatcher = Dispatcher::new(chat.clone(), config.relay.command_prefix.clone());
    let poller = Poller::new(
        registry.clone(),
        store.clone(),
        feed.clone(),
        vault.clone(),
        dispatcher,
        Pacing::from(&config.poller),
    );

    let handler = Arc::new(CommandHandler::new(
        registry.clone(),
        feed,
        vault,
        chat.clone(),
        CommandSettings::from(&config),
    ));
    let drain = Duration::from_secs(config.commands.confirm_timeout_secs) + COMMAND_DRAIN_GRACE;
    let pump = tokio::spawn(run_pump(chat.clone(), handler, cancel.clone(), drain));

    let outcome = match poller.startup(&cancel).await {
        Ok(()) => {
            info!("startup complete, polling");
            poller.run(cancel.clone()).await;
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            cancel.cancel();
            Err(e)
        }
    };

    if let Err(e) = pump.await {
        warn!(error = %e, "command pump task failed");
    }

    if let Err(e) = final_flush(&registry, &store).await {
        error!(error = %e, "final registry flush failed");
    }
    fetcher.close();
    if let Err(e) = chat.shutdown().await {
        warn!(error = %e, "discord shutdown failed");
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "store shutdown failed");
    }

    info!("flatrelay serve shutdown complete");
    outcome
}

#[cfg(feature = "gateway")]
fn spawn_gateway(config: &RelayConfig, cancel: &tokio_util::sync::CancellationToken) {
    if !config.gateway.enabled {
        info!("keep-alive gateway disabled");
        return;
    }
    let gateway = config.gateway.clone();
    let gateway_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = flatrelay_gateway::serve(&gateway, gateway_cancel).await {
            error!(error = %e, "keep-alive gateway stopped");
        }
    });
}

#[cfg(not(feature = "gateway"))]
fn spawn_gateway(_config: &RelayConfig, _cancel: &tokio_util::sync::CancellationToken) {
    info!("built without keep-alive gateway");
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flatrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
