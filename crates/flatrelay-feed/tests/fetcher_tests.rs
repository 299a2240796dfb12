// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetcher behaviour against a mocked Flat.io API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flatrelay_config::model::FeedConfig;
use flatrelay_core::traits::FeedSource;
use flatrelay_core::RelayError;
use flatrelay_feed::Fetcher;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(server: &MockServer, max_concurrent: usize) -> Fetcher {
    let config = FeedConfig {
        base_url: format!("{}/v2", server.uri()),
        page_size: 5,
        max_concurrent_requests: max_concurrent,
        request_timeout_secs: 5,
        ..FeedConfig::default()
    };
    Fetcher::new(&config).unwrap()
}

fn token() -> SecretString {
    SecretString::from("tok-1")
}

#[tokio::test]
async fn fetch_sends_bearer_token_and_parses_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/me/notifications"))
        .and(query_param("expand", "actor,score"))
        .and(query_param("returnOptInScoresInvitations", "true"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "n2", "type": "userFollow", "actor": {"id": "u1", "username": "ann"}},
            {"id": "n1", "type": "scoreStar"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher_for(&server, 2).fetch(&token()).await.unwrap();
    let ids: Vec<_> = page.iter().map(|e| e.id().0.clone()).collect();
    assert_eq!(ids, ["n2", "n1"]);
}

#[tokio::test]
async fn unauthorized_is_an_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .mount(&server)
        .await;

    assert!(fetcher_for(&server, 2).fetch(&token()).await.unwrap().is_empty());
}

#[tokio::test]
async fn not_found_is_an_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(fetcher_for(&server, 2).fetch(&token()).await.unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_a_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = fetcher_for(&server, 2).fetch(&token()).await.unwrap_err();
    assert!(matches!(err, RelayError::Feed { .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn invalid_body_is_a_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(fetcher_for(&server, 2).fetch(&token()).await.is_err());
}

#[tokio::test]
async fn transport_error_is_a_hard_failure() {
    let server = MockServer::start().await;
    let fetcher = fetcher_for(&server, 2);
    drop(server);

    let err = fetcher.fetch(&token()).await.unwrap_err();
    assert!(matches!(err, RelayError::Feed { .. }));
}

#[tokio::test]
async fn closed_fetcher_fails_fast() {
    let server = MockServer::start().await;
    let fetcher = fetcher_for(&server, 2);
    fetcher.close();
    assert!(fetcher.fetch(&token()).await.is_err());
}

#[tokio::test]
async fn admission_gate_caps_concurrency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let fetcher = Arc::new(fetcher_for(&server, 1));
    let started = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch(&token()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(started.elapsed() >= Duration::from_millis(450));
    assert_eq!(fetcher.available_slots(), 1);
}

#[tokio::test]
async fn lookup_resolves_username_to_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/ann"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "5f1a",
            "username": "ann",
            "printableName": "Ann"
        })))
        .mount(&server)
        .await;

    let user = fetcher_for(&server, 2)
        .lookup_user("ann", &token())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, "5f1a");
    assert_eq!(user.username, "ann");
}

#[tokio::test]
async fn lookup_of_unknown_user_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(fetcher_for(&server, 2)
        .lookup_user("ghost", &token())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn in_flight_request_survives_refresh_and_close() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "1"}]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let fetcher = Arc::new(fetcher_for(&server, 2));
    let in_flight = {
        let fetcher = fetcher.clone();
        tokio::spawn(async move { fetcher.fetch(&token()).await })
    };

    // Swap the pool only once the request reached the server.
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request should reach the server");
    fetcher.refresh().unwrap();
    fetcher.close();

    let page = in_flight.await.unwrap().unwrap();
    assert_eq!(page.len(), 1);
    assert!(fetcher.fetch(&token()).await.is_err());
}

#[tokio::test]
async fn refresh_keeps_serving_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, 2);
    assert_eq!(fetcher.fetch(&token()).await.unwrap().len(), 1);
    fetcher.refresh().unwrap();
    assert_eq!(fetcher.fetch(&token()).await.unwrap().len(), 1);
}
