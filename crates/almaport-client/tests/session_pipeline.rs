//! Tests for the session request pipeline with wiremock.
//!
//! Covers bearer attachment, the one-shot refresh-and-retry on 401,
//! single-flight refresh deduplication, and session termination.


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use almaport_client::api::{activities, events, projects};
use almaport_client::error::ApiErrorKind;
use almaport_client::session::SessionClient;
use almaport_client::session::store::{MemoryTokenStore, StoredToken, TokenKind, TokenStore};
use fixtures::{DAY, HOUR, bearer_of, mock_config, now_millis, seeded_store};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[tokio::test]
async fn test_attaches_stored_access_token() {
    let mock_server = MockServer::start().await;
    let captured = Arc::new(std::sync::Mutex::new(None));
    let captured_clone = captured.clone();

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(move |req: &Request| {
            *captured_clone.lock().unwrap() = bearer_of(req);
            ResponseTemplate::new(200).set_body_json(serde_json::json!([]))
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), None);
    let client = SessionClient::new(&mock_config(&mock_server), store).unwrap();

    let listed = events::list(&client).await.unwrap();

    assert!(listed.is_empty());
    assert_eq!(captured.lock().unwrap().as_deref(), Some("Bearer A1"));
}

#[tokio::test]
async fn test_expired_access_token_not_attached() {
    let mock_server = MockServer::start().await;
    let captured = Arc::new(std::sync::Mutex::new(None));
    let captured_clone = captured.clone();

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(move |req: &Request| {
            *captured_clone.lock().unwrap() = bearer_of(req);
            ResponseTemplate::new(200).set_body_json(serde_json::json!([]))
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(None, None);
    store
        .set(
            TokenKind::Access,
            StoredToken {
                value: "stale".to_string(),
                expires: 1,
            },
        )
        .unwrap();
    let client = SessionClient::new(&mock_config(&mock_server), store).unwrap();

    events::list(&client).await.unwrap();

    assert_eq!(captured.lock().unwrap().as_deref(), None);
}

#[tokio::test]
async fn test_refresh_then_retry_end_to_end() {
    let mock_server = MockServer::start().await;

    let events_calls = Arc::new(AtomicUsize::new(0));
    let events_calls_clone = events_calls.clone();
    let retry_bearer = Arc::new(std::sync::Mutex::new(None));
    let retry_bearer_clone = retry_bearer.clone();

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(move |req: &Request| {
            let count = events_calls_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "detail": "Token expired" }))
            } else {
                *retry_bearer_clone.lock().unwrap() = bearer_of(req);
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                    "id": 1, "title": "Homecoming", "event_date": "2026-09-12T18:00:00Z"
                }]))
            }
        })
        .expect(2)
        .mount(&mock_server)
        .await;

    let refresh_body = Arc::new(std::sync::Mutex::new(String::new()));
    let refresh_body_clone = refresh_body.clone();

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(move |req: &Request| {
            *refresh_body_clone.lock().unwrap() = String::from_utf8_lossy(&req.body).to_string();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": "A2" }))
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), Some("R1"));
    let client = SessionClient::new(&mock_config(&mock_server), store.clone()).unwrap();

    let listed = events::list(&client).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Homecoming");
    assert_eq!(retry_bearer.lock().unwrap().as_deref(), Some("Bearer A2"));

    let body = refresh_body.lock().unwrap().clone();
    assert!(
        body.contains("R1"),
        "Refresh request should carry the stored refresh token. Got: {}",
        body
    );

    let access = store.get(TokenKind::Access).unwrap().unwrap();
    assert_eq!(access.value, "A2");
    let refresh = store.get(TokenKind::Refresh).unwrap().unwrap();
    assert_eq!(refresh.value, "R1");
}

#[tokio::test]
async fn test_second_401_surfaces_without_second_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Still unauthorized" })),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": "A2" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), Some("R1"));
    let client = SessionClient::new(&mock_config(&mock_server), store).unwrap();

    let err = events::list(&client).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus);
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Still unauthorized");
}

#[tokio::test]
async fn test_missing_refresh_token_terminates_without_refresh_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Token expired" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": "A2" })),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), None);
    let client = SessionClient::new(&mock_config(&mock_server), store.clone()).unwrap();

    let err = events::list(&client).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);

    let expired = client.subscribe();
    let expiry = expired.borrow().clone().unwrap();
    assert_eq!(expiry.next.as_deref(), Some("/api/events/"));
    assert_eq!(expiry.login_route(), "/login?next=%2Fapi%2Fevents%2F");
}

#[tokio::test]
async fn test_rejected_refresh_purges_and_signals() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/activities/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Token expired" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Token is invalid or expired" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), Some("R1"));
    let client = SessionClient::new(&mock_config(&mock_server), store.clone()).unwrap();

    let err = activities::list(&client).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);
    assert_eq!(store.get(TokenKind::Refresh).unwrap(), None);

    let expired = client.subscribe();
    let expiry = expired.borrow().clone().unwrap();
    assert_eq!(expiry.next.as_deref(), Some("/api/activities/"));
}

/// Delegates to a memory store, but refresh reads fail and clears are
/// recorded.
struct BrokenRefreshStore {
    inner: MemoryTokenStore,
    cleared: AtomicBool,
}

impl TokenStore for BrokenRefreshStore {
    fn get(&self, kind: TokenKind) -> anyhow::Result<Option<StoredToken>> {
        if kind == TokenKind::Refresh {
            anyhow::bail!("session file corrupt");
        }
        self.inner.get(kind)
    }

    fn set(&self, kind: TokenKind, token: StoredToken) -> anyhow::Result<()> {
        self.inner.set(kind, token)
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.cleared.store(true, Ordering::SeqCst);
        self.inner.clear()
    }
}

#[tokio::test]
async fn test_unreadable_store_mid_refresh_terminates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Token expired" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": "A2" })),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = Arc::new(BrokenRefreshStore {
        inner: MemoryTokenStore::new(),
        cleared: AtomicBool::new(false),
    });
    store
        .set(TokenKind::Access, StoredToken::new("A1", HOUR))
        .unwrap();
    let client = SessionClient::new(&mock_config(&mock_server), store.clone()).unwrap();

    let err = events::list(&client).await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert!(store.cleared.load(Ordering::SeqCst));
    assert_eq!(store.get(TokenKind::Access).unwrap(), None);

    let expired = client.subscribe();
    let expiry = expired.borrow().clone().unwrap();
    assert_eq!(expiry.next.as_deref(), Some("/api/events/"));
}

#[tokio::test]
async fn test_login_remember_selects_refresh_ttl_class() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access": "A1", "refresh": "R1" })),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = mock_config(&mock_server);
    let day_ms = u64::try_from(DAY.as_millis()).unwrap();
    let hour_ms = u64::try_from(HOUR.as_millis()).unwrap();

    let remembered = seeded_store(None, None);
    let client = SessionClient::new(&config, remembered.clone()).unwrap();
    let credentials = client
        .login("ada@example.com", "hunter2", true)
        .await
        .unwrap();
    assert_eq!(credentials.access, "A1");
    assert_eq!(credentials.refresh, "R1");

    let now = now_millis();
    let refresh = remembered.get(TokenKind::Refresh).unwrap().unwrap();
    assert!(
        refresh.expires > now + 29 * day_ms && refresh.expires < now + 31 * day_ms,
        "remembered refresh expiry should be ~30 days out, got {}",
        refresh.expires
    );
    let remembered_access = remembered.get(TokenKind::Access).unwrap().unwrap();
    assert!(
        remembered_access.expires > now + hour_ms / 2
            && remembered_access.expires < now + 2 * hour_ms,
        "access expiry should be ~1 hour out, got {}",
        remembered_access.expires
    );

    let forgotten = seeded_store(None, None);
    let client = SessionClient::new(&config, forgotten.clone()).unwrap();
    client
        .login("ada@example.com", "hunter2", false)
        .await
        .unwrap();

    let now = now_millis();
    let refresh = forgotten.get(TokenKind::Refresh).unwrap().unwrap();
    assert!(
        refresh.expires > now + 23 * hour_ms && refresh.expires < now + 25 * hour_ms,
        "default refresh expiry should be ~1 day out, got {}",
        refresh.expires
    );
    let forgotten_access = forgotten.get(TokenKind::Access).unwrap().unwrap();
    assert!(
        forgotten_access.expires > now + hour_ms / 2
            && forgotten_access.expires < now + 2 * hour_ms,
        "access expiry should be ~1 hour out either way, got {}",
        forgotten_access.expires
    );
}

#[tokio::test]
async fn test_rejected_login_leaves_store_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(
            serde_json::json!({ "detail": "No active account found with the given credentials" }),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A0"), Some("R0"));
    let client = SessionClient::new(&mock_config(&mock_server), store.clone()).unwrap();

    let err = client
        .login("ada@example.com", "wrong", false)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::InvalidCredentials);
    assert_eq!(err.status, Some(401));
    assert_eq!(store.get(TokenKind::Access).unwrap().unwrap().value, "A0");
    assert_eq!(store.get(TokenKind::Refresh).unwrap().unwrap().value, "R0");
}

fn reject_until_a2(req: &Request) -> ResponseTemplate {
    match bearer_of(req).as_deref() {
        Some("Bearer A2") => ResponseTemplate::new(200).set_body_json(serde_json::json!([])),
        _ => ResponseTemplate::new(401)
            .set_body_json(serde_json::json!({ "detail": "Token expired" })),
    }
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/events/"))
        .respond_with(reject_until_a2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/activities/"))
        .respond_with(reject_until_a2)
        .expect(2)
        .mount(&mock_server)
        .await;

    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let refresh_calls_clone = refresh_calls.clone();

    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(move |_req: &Request| {
            refresh_calls_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access": "A2" }))
                .set_delay(Duration::from_millis(100))
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("A1"), Some("R1"));
    let client = SessionClient::new(&mock_config(&mock_server), store).unwrap();

    let (listed_events, listed_activities) =
        tokio::join!(events::list(&client), activities::list(&client));

    assert!(listed_events.unwrap().is_empty());
    assert!(listed_activities.unwrap().is_empty());
    assert_eq!(
        refresh_calls.load(Ordering::SeqCst),
        1,
        "concurrent 401s must share a single refresh"
    );
}

#[tokio::test]
async fn test_login_clears_expiry_signal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Token expired" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access": "A1", "refresh": "R1" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = seeded_store(Some("stale"), None);
    let client = SessionClient::new(&mock_config(&mock_server), store).unwrap();

    let err = projects::list(&client).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert!(client.subscribe().borrow().is_some());

    client
        .login("ada@example.com", "hunter2", false)
        .await
        .unwrap();
    assert!(client.subscribe().borrow().is_none());
}
