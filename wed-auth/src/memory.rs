// In-process identity provider for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::info;
use wed_core::{WedError, WedResult};

use crate::options::SignInProvider;
use crate::provider::{AuthUser, IdentityProvider, SessionReceiver};

/// Identity provider backed by a fixed account table.
///
/// `sign_in` succeeds for providers that have an account registered and
/// publishes the session on the watch channel.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    accounts: Arc<RwLock<HashMap<SignInProvider, AuthUser>>>,
    session: Arc<watch::Sender<Option<AuthUser>>>,
    reject_sign_out: Arc<AtomicBool>,
    stall_sign_in: Arc<AtomicBool>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            session: Arc::new(tx),
            reject_sign_out: Arc::new(AtomicBool::new(false)),
            stall_sign_in: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register the account a provider signs in as
    pub fn with_account(self, provider: SignInProvider, user: AuthUser) -> Self {
        self.accounts.write().insert(provider, user);
        self
    }

    /// Make subsequent sign-out requests fail (the session is kept)
    pub fn reject_sign_out(&self, reject: bool) {
        self.reject_sign_out.store(reject, Ordering::SeqCst);
    }

    /// Drop the session without a sign-out request, as an expired
    /// credential would
    pub fn expire_session(&self) {
        self.session.send_replace(None);
    }

    /// Leave subsequent sign-in requests pending, as an abandoned popup
    /// would
    pub fn stall_sign_in(&self, stall: bool) {
        self.stall_sign_in.store(stall, Ordering::SeqCst);
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn subscribe(&self) -> SessionReceiver {
        self.session.subscribe()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.session.borrow().clone()
    }

    async fn sign_in(&self, provider: SignInProvider) -> WedResult<AuthUser> {
        if self.stall_sign_in.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let user = self.accounts.read().get(&provider).cloned().ok_or_else(|| {
            WedError::not_authenticated(format!("sign-in with {} was rejected", provider.id()))
                .into_anyhow()
        })?;

        info!(user_id = %user.id, provider = provider.id(), "signed in");
        self.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> WedResult<()> {
        if self.reject_sign_out.load(Ordering::SeqCst) {
            return Err(WedError::unavailable("identity provider unreachable").into_anyhow());
        }
        self.session.send_replace(None);
        Ok(())
    }
}
