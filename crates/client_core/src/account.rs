//! Ambient account state (credits, trial banner, referrals) fetched from the
//! remote user record with an explicit refresh policy.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::protocol::UserRecord;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{backend::parse_base_url, identity::IdentityStatus};

#[async_trait]
pub trait UserRecordSource: Send + Sync {
    async fn fetch_user(&self, email: &str) -> Result<UserRecord>;
}

pub struct HttpUserRecordSource {
    http: Client,
    base_url: Url,
}

impl HttpUserRecordSource {
    pub fn new(http: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    fn user_url(&self, email: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api base url cannot carry a path"))?
            .pop_if_empty()
            .push("user")
            .push(email);
        Ok(url)
    }
}

#[async_trait]
impl UserRecordSource for HttpUserRecordSource {
    async fn fetch_user(&self, email: &str) -> Result<UserRecord> {
        let url = self.user_url(email)?;
        let record = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<UserRecord>()
            .await
            .context("failed to decode user record")?;
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every mount refetches; reads in between use the cache.
    OnMount,
    /// Fetch once, then only after `invalidate`.
    Manual,
    /// Refetch when the cached record is older than the given age.
    MaxAge(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub record: UserRecord,
    pub fetched_at: DateTime<Utc>,
}

struct CachedAccount {
    email: String,
    snapshot: AccountSnapshot,
    fetched: Instant,
    stale: bool,
}

pub struct AccountStore {
    source: Arc<dyn UserRecordSource>,
    policy: RefreshPolicy,
    cache: Mutex<Option<CachedAccount>>,
}

impl AccountStore {
    pub fn new(source: Arc<dyn UserRecordSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            cache: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Called when a page showing account state is mounted.
    pub async fn mount(&self, identity: &IdentityStatus) -> Result<Option<AccountSnapshot>> {
        if self.policy == RefreshPolicy::OnMount {
            self.invalidate().await;
        }
        self.load(identity).await
    }

    /// Returns the account for the signed-in user, fetching only when the
    /// policy says the cache cannot be used. A failed fetch keeps the previous
    /// cache entry and returns the error.
    pub async fn load(&self, identity: &IdentityStatus) -> Result<Option<AccountSnapshot>> {
        let email = match identity {
            IdentityStatus::Absent => {
                self.cache.lock().await.take();
                return Ok(None);
            }
            IdentityStatus::Pending => return Ok(None),
            IdentityStatus::Resolved(_) => match identity.signed_in() {
                Some(identity) => identity.email.clone(),
                None => return Ok(None),
            },
        };

        {
            let guard = self.cache.lock().await;
            if let Some(cached) = guard.as_ref() {
                if cached.email == email && !self.needs_refresh(cached) {
                    debug!("account: cache hit email={email}");
                    return Ok(Some(cached.snapshot.clone()));
                }
            }
        }

        self.fetch(&email).await.map(Some)
    }

    /// Fetches regardless of policy.
    pub async fn refresh(&self, identity: &IdentityStatus) -> Result<Option<AccountSnapshot>> {
        self.invalidate().await;
        self.load(identity).await
    }

    pub async fn invalidate(&self) {
        if let Some(cached) = self.cache.lock().await.as_mut() {
            cached.stale = true;
        }
    }

    pub async fn cached(&self) -> Option<AccountSnapshot> {
        self.cache
            .lock()
            .await
            .as_ref()
            .map(|cached| cached.snapshot.clone())
    }

    fn needs_refresh(&self, cached: &CachedAccount) -> bool {
        if cached.stale {
            return true;
        }
        match self.policy {
            RefreshPolicy::OnMount | RefreshPolicy::Manual => false,
            RefreshPolicy::MaxAge(max_age) => cached.fetched.elapsed() >= max_age,
        }
    }

    async fn fetch(&self, email: &str) -> Result<AccountSnapshot> {
        let record = match self.source.fetch_user(email).await {
            Ok(record) => record,
            Err(err) => {
                warn!("account: user record fetch failed email={email} error={err:#}");
                return Err(err.context(format!("failed to load account for {email}")));
            }
        };

        info!(
            "account: loaded email={} credits={} trial_claimed={}",
            email, record.credits, record.trial_claimed
        );
        let snapshot = AccountSnapshot {
            record,
            fetched_at: Utc::now(),
        };
        *self.cache.lock().await = Some(CachedAccount {
            email: email.to_string(),
            snapshot: snapshot.clone(),
            fetched: Instant::now(),
            stale: false,
        });
        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
