//! Identity capability consumed by wizards and the account store.

use async_trait::async_trait;
use shared::domain::Identity;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStatus {
    Resolved(Identity),
    Pending,
    Absent,
}

impl IdentityStatus {
    /// Resolved identity with a usable email, if any.
    pub fn signed_in(&self) -> Option<&Identity> {
        match self {
            Self::Resolved(identity) if !identity.email.trim().is_empty() => Some(identity),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::Pending => "pending",
            Self::Absent => "absent",
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_identity(&self) -> IdentityStatus;
}

/// Fixed identity, e.g. an email passed on the command line.
pub struct StaticIdentity {
    status: IdentityStatus,
}

impl StaticIdentity {
    pub fn signed_in(email: impl Into<String>) -> Self {
        Self {
            status: IdentityStatus::Resolved(Identity::new(email)),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            status: IdentityStatus::Absent,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_identity(&self) -> IdentityStatus {
        self.status.clone()
    }
}

/// Identity that starts pending and is resolved later by whoever holds the
/// matching [`DeferredIdentityHandle`].
pub struct DeferredIdentity {
    rx: watch::Receiver<IdentityStatus>,
}

#[derive(Clone)]
pub struct DeferredIdentityHandle {
    tx: watch::Sender<IdentityStatus>,
}

impl DeferredIdentity {
    pub fn pending() -> (Self, DeferredIdentityHandle) {
        let (tx, rx) = watch::channel(IdentityStatus::Pending);
        (Self { rx }, DeferredIdentityHandle { tx })
    }
}

impl DeferredIdentityHandle {
    pub fn resolve(&self, identity: Identity) {
        self.tx.send_replace(IdentityStatus::Resolved(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(IdentityStatus::Absent);
    }
}

#[async_trait]
impl IdentityProvider for DeferredIdentity {
    async fn current_identity(&self) -> IdentityStatus {
        self.rx.borrow().clone()
    }
}
