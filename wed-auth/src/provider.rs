// Identity provider seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use wed_core::{UserContext, WedResult};

use crate::options::SignInProvider;

/// Signed-in user as reported by the identity provider
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn context(&self) -> UserContext {
        UserContext::new(self.id.clone())
    }
}

/// Session state notifications: `Some(user)` on sign-in, `None` on sign-out.
pub type SessionReceiver = watch::Receiver<Option<AuthUser>>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to session changes. The current session is observable
    /// immediately through `borrow()`.
    fn subscribe(&self) -> SessionReceiver;

    fn current_user(&self) -> Option<AuthUser>;

    async fn sign_in(&self, provider: SignInProvider) -> WedResult<AuthUser>;

    async fn sign_out(&self) -> WedResult<()>;
}
