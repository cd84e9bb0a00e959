use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use shared::domain::Identity;
use tokio::net::TcpListener;

struct CountingSource {
    fetches: AtomicUsize,
    failing: AtomicBool,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRecordSource for CountingSource {
    async fn fetch_user(&self, email: &str) -> Result<UserRecord> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(UserRecord {
            email: email.to_string(),
            credits: n as i64 * 10,
            account: Some("free".to_string()),
            trial_claimed: false,
            trial_expires_at: None,
            referral_code: Some("CREATOR1".to_string()),
            referrals: 2,
        })
    }
}

fn signed_in(email: &str) -> IdentityStatus {
    IdentityStatus::Resolved(Identity::new(email))
}

#[tokio::test]
async fn on_mount_policy_refetches_each_mount_but_not_between() {
    let source = Arc::new(CountingSource::new());
    let store = AccountStore::new(source.clone(), RefreshPolicy::OnMount);
    let me = signed_in("creator@example.com");

    let first = store.mount(&me).await.expect("mount").expect("account");
    let read = store.load(&me).await.expect("load").expect("account");
    assert_eq!(first, read);
    assert_eq!(source.fetches(), 1);

    let second = store.mount(&me).await.expect("mount").expect("account");
    assert_eq!(second.record.credits, 20);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn manual_policy_waits_for_invalidation() {
    let source = Arc::new(CountingSource::new());
    let store = AccountStore::new(source.clone(), RefreshPolicy::Manual);
    let me = signed_in("creator@example.com");

    store.mount(&me).await.expect("mount");
    store.mount(&me).await.expect("mount");
    assert_eq!(source.fetches(), 1);

    store.invalidate().await;
    let refreshed = store.load(&me).await.expect("load").expect("account");
    assert_eq!(refreshed.record.credits, 20);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn max_age_policy_refetches_expired_records() {
    let source = Arc::new(CountingSource::new());
    let fresh = AccountStore::new(source.clone(), RefreshPolicy::MaxAge(Duration::from_secs(600)));
    let me = signed_in("creator@example.com");

    fresh.load(&me).await.expect("load");
    fresh.load(&me).await.expect("load");
    assert_eq!(source.fetches(), 1);

    let expired = AccountStore::new(source.clone(), RefreshPolicy::MaxAge(Duration::ZERO));
    expired.load(&me).await.expect("load");
    expired.load(&me).await.expect("load");
    assert_eq!(source.fetches(), 3);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_record() {
    let source = Arc::new(CountingSource::new());
    let store = AccountStore::new(source.clone(), RefreshPolicy::Manual);
    let me = signed_in("creator@example.com");
    let loaded = store.load(&me).await.expect("load").expect("account");

    source.failing.store(true, Ordering::SeqCst);
    let err = store.refresh(&me).await.expect_err("fetch fails");

    assert!(format!("{err:#}").contains("connection refused"));
    assert_eq!(store.cached().await, Some(loaded));
}

#[tokio::test]
async fn identity_changes_drive_the_cache() {
    let source = Arc::new(CountingSource::new());
    let store = AccountStore::new(source.clone(), RefreshPolicy::Manual);

    assert_eq!(store.load(&IdentityStatus::Pending).await.expect("pending"), None);
    assert_eq!(source.fetches(), 0);

    store
        .load(&signed_in("one@example.com"))
        .await
        .expect("load");
    let other = store
        .load(&signed_in("two@example.com"))
        .await
        .expect("load")
        .expect("account");
    assert_eq!(other.record.email, "two@example.com");
    assert_eq!(source.fetches(), 2);

    assert_eq!(store.load(&IdentityStatus::Absent).await.expect("absent"), None);
    assert_eq!(store.cached().await, None);
}

async fn handle_user(Path(email): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
    if email != "creator@example.com" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "no such user" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "email": email,
            "credits": 42,
            "account": "pro",
            "trial_claimed": true,
            "referral_code": "CREATOR1",
            "achievements": []
        })),
    )
}

async fn spawn_user_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/api/user/:email", get(handle_user));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

#[tokio::test]
async fn http_source_reads_user_record_by_email() {
    let base_url = spawn_user_server().await.expect("spawn server");
    let source = HttpUserRecordSource::new(Client::new(), &base_url).expect("source");

    let record = source
        .fetch_user("creator@example.com")
        .await
        .expect("record");
    assert_eq!(record.credits, 42);
    assert!(!record.shows_trial_banner());
    assert_eq!(record.referral_code.as_deref(), Some("CREATOR1"));

    let err = source
        .fetch_user("ghost@example.com")
        .await
        .expect_err("404");
    assert!(err.to_string().contains("404"));
}
