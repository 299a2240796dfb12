// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Flat.io REST API.
//!
//! Provides [`Fetcher`], which gates every outbound call behind a shared
//! semaphore and normalizes auth and not-found responses into empty
//! results. The underlying `reqwest::Client` sits behind an `ArcSwap` so
//! it can be replaced while earlier requests finish on the old one.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use flatrelay_config::model::FeedConfig;
use flatrelay_core::traits::{FeedSource, FeedUser};
use flatrelay_core::{FeedEvent, RelayError};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Query appended to the notifications endpoint.
const NOTIFICATION_QUERY: &str = "expand=actor,score&returnOptInScoresInvitations=true";

#[derive(Debug)]
pub struct Fetcher {
    pool: ArcSwapOption<reqwest::Client>,
    gate: Semaphore,
    base_url: String,
    page_size: usize,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &FeedConfig) -> Result<Self, RelayError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = build_client(timeout)?;
        Ok(Self {
            pool: ArcSwapOption::from_pointee(client),
            gate: Semaphore::new(config.max_concurrent_requests.max(1)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            timeout,
        })
    }

    /// Full notifications URL including the page size.
    pub fn notifications_url(&self) -> String {
        format!(
            "{}/me/notifications?{NOTIFICATION_QUERY}&limit={}",
            self.base_url, self.page_size
        )
    }

    fn user_url(&self, identifier: &str) -> Result<reqwest::Url, RelayError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| RelayError::Feed {
            message: format!("invalid feed base URL: {e}"),
            source: Some(Box::new(e)),
        })?;
        url.path_segments_mut()
            .map_err(|_| RelayError::feed("feed base URL cannot carry a path"))?
            .pop_if_empty()
            .push("users")
            .push(identifier);
        Ok(url)
    }

    /// Current pool, or an error once [`close`](Self::close) ran.
    fn client(&self) -> Result<Arc<reqwest::Client>, RelayError> {
        self.pool
            .load_full()
            .ok_or_else(|| RelayError::feed("feed client is closed"))
    }

    /// Replaces the connection pool. Requests already holding the old
    /// client keep using it until they complete.
    pub fn refresh(&self) -> Result<(), RelayError> {
        if self.pool.load().is_none() {
            return Err(RelayError::feed("feed client is closed"));
        }
        let client = build_client(self.timeout)?;
        self.pool.store(Some(Arc::new(client)));
        info!("feed connection pool refreshed");
        Ok(())
    }

    /// Drops the pool. Later calls fail; in-flight calls settle on their own.
    pub fn close(&self) {
        self.pool.store(None);
        debug!("feed connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.load().is_none()
    }

    /// Free admission slots.
    pub fn available_slots(&self) -> usize {
        self.gate.available_permits()
    }

    async fn get(&self, url: reqwest::Url, credential: &SecretString) -> Result<reqwest::Response, RelayError> {
        let client = self.client()?;
        client
            .get(url)
            .bearer_auth(credential.expose_secret())
            .send()
            .await
            .map_err(|e| RelayError::Feed {
                message: format!("feed request failed: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, RelayError> {
        self.gate
            .acquire()
            .await
            .map_err(|_| RelayError::Internal("feed admission gate closed".to_string()))
    }
}

/// Soft failures: the user's credential or resource is bad, not the service.
fn is_soft_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND)
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("flatrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RelayError::Feed {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Parses a notifications page, dropping items without a usable id.
fn parse_page(items: Vec<Value>) -> Vec<FeedEvent> {
    items
        .into_iter()
        .filter_map(|raw| match FeedEvent::try_from(raw) {
            Ok(event) => Some(event),
            Err(reason) => {
                warn!(%reason, "skipping malformed feed event");
                None
            }
        })
        .collect()
}

#[async_trait]
impl FeedSource for Fetcher {
    async fn fetch(&self, credential: &SecretString) -> Result<Vec<FeedEvent>, RelayError> {
        let _permit = self.acquire().await?;
        let url = reqwest::Url::parse(&self.notifications_url()).map_err(|e| RelayError::Feed {
            message: format!("invalid notifications URL: {e}"),
            source: Some(Box::new(e)),
        })?;

        let response = self.get(url, credential).await?;
        let status = response.status();
        if is_soft_failure(status) {
            debug!(status = %status, "feed soft failure, returning empty page");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "feed returned an error status");
            return Err(RelayError::feed(format!("feed returned {status}: {body}")));
        }

        let items: Vec<Value> = response.json().await.map_err(|e| RelayError::Feed {
            message: format!("failed to parse notifications: {e}"),
            source: Some(Box::new(e)),
        })?;
        let page = parse_page(items);
        debug!(events = page.len(), "fetched notifications page");
        Ok(page)
    }

    async fn lookup_user(
        &self,
        identifier: &str,
        credential: &SecretString,
    ) -> Result<Option<FeedUser>, RelayError> {
        let _permit = self.acquire().await?;
        let url = self.user_url(identifier)?;

        let response = self.get(url, credential).await?;
        let status = response.status();
        if is_soft_failure(status) || status == StatusCode::BAD_REQUEST {
            debug!(status = %status, identifier, "feed user not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RelayError::feed(format!("user lookup returned {status}")));
        }

        let user: FeedUser = response.json().await.map_err(|e| RelayError::Feed {
            message: format!("failed to parse user: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> Fetcher {
        let config = FeedConfig {
            base_url: base_url.to_string(),
            ..FeedConfig::default()
        };
        Fetcher::new(&config).unwrap()
    }

    #[test]
    fn notifications_url_carries_expansion_and_limit() {
        let url = fetcher("https://api.flat.io/v2/").notifications_url();
        assert_eq!(
            url,
            "https://api.flat.io/v2/me/notifications?expand=actor,score&returnOptInScoresInvitations=true&limit=20"
        );
    }

    #[test]
    fn user_url_encodes_identifier() {
        let url = fetcher("https://api.flat.io/v2").user_url("a b/c").unwrap();
        assert_eq!(url.as_str(), "https://api.flat.io/v2/users/a%20b%2Fc");
    }

    #[test]
    fn soft_failures_are_auth_and_not_found() {
        assert!(is_soft_failure(StatusCode::UNAUTHORIZED));
        assert!(is_soft_failure(StatusCode::NOT_FOUND));
        assert!(!is_soft_failure(StatusCode::FORBIDDEN));
        assert!(!is_soft_failure(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn refresh_swaps_pool_and_keeps_old_client_alive() {
        let fetcher = fetcher("https://api.flat.io/v2");
        let before = fetcher.client().unwrap();
        fetcher.refresh().unwrap();
        let after = fetcher.client().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(Arc::strong_count(&before), 1);
    }

    #[test]
    fn closed_fetcher_refuses_work() {
        let fetcher = fetcher("https://api.flat.io/v2");
        fetcher.close();
        assert!(fetcher.is_closed());
        assert!(fetcher.client().is_err());
        assert!(fetcher.refresh().is_err());
    }

    #[test]
    fn malformed_items_are_skipped() {
        let page = parse_page(vec![
            serde_json::json!({"id": "1"}),
            serde_json::json!({"type": "userFollow"}),
            serde_json::json!({"id": 2}),
        ]);
        assert_eq!(page.len(), 2);
    }
}
