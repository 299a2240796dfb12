// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness HTTP server built on axum.

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use flatrelay_config::model::GatewayConfig;
use flatrelay_core::RelayError;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Router answering `GET /` with `body`.
pub fn router(body: impl Into<String>) -> Router {
    let body: Arc<str> = Arc::from(body.into());
    Router::new()
        .route("/", get(alive))
        .with_state(body)
        .layer(TraceLayer::new_for_http())
}

async fn alive(State(body): State<Arc<str>>) -> String {
    body.to_string()
}

/// Binds `config.host:config.port` and serves until `cancel` fires.
pub async fn serve(config: &GatewayConfig, cancel: CancellationToken) -> Result<(), RelayError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;
    info!(%addr, "liveness endpoint listening");

    axum::serve(listener, router(config.body.clone()))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    info!("liveness endpoint stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_returns_configured_body() {
        let response = router("I'm alive")
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"I'm alive");
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let response = router("x")
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let config = GatewayConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 0,
            body: "ok".into(),
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { serve(&config, cancel).await }
        });
        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serve_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = GatewayConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: taken.local_addr().unwrap().port(),
            body: "ok".into(),
        };
        assert!(serve(&config, CancellationToken::new()).await.is_err());
    }
}
