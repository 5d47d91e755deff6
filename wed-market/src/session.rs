//! Session/view controller.
//!
//! Follows the identity provider's session notifications: a new session
//! shows the dashboard and rehydrates the user's photos, a lost session
//! drops every local file and tag and shows the landing page.
//!
//! Every session change bumps a generation counter. A photo reload only
//! merges if no other change happened while it was in flight.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use wed_auth::{AuthUser, SessionReceiver, SignInProvider};
use wed_core::{UserContext, WedError};

use crate::error::{MarketError, MarketResult};
use crate::gallery::PublicGallery;
use crate::records::ListingRecord;
use crate::services::MarketServices;
use crate::staging::{shared_files, CandidateFile, PreviewRegistry, SharedFiles, StagedFile};
use crate::sync::{DeleteReport, UploadOutcome, UploadSync};
use crate::tags::TagAnnotator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Landing,
    Dashboard { user: AuthUser },
}

struct SessionState {
    view: View,
    generation: u64,
}

#[derive(Clone)]
pub struct SessionController {
    services: MarketServices,
    files: SharedFiles,
    sync: UploadSync,
    annotator: TagAnnotator,
    gallery: PublicGallery,
    state: Arc<RwLock<SessionState>>,
}

impl SessionController {
    pub fn new(services: MarketServices, previews: Arc<dyn PreviewRegistry>) -> Self {
        let files = shared_files(previews);
        let config = services.config.clone();
        let sync = UploadSync::new(
            services.blobs.clone(),
            services.docs.clone(),
            files.clone(),
            config.listings_collection.clone(),
        );
        let annotator = TagAnnotator::new(
            services.docs.clone(),
            files.clone(),
            config.tags_collection.clone(),
        );
        let gallery = PublicGallery::new(services.docs.clone(), config.listings_collection.clone());

        Self {
            services,
            files,
            sync,
            annotator,
            gallery,
            state: Arc::new(RwLock::new(SessionState {
                view: View::Landing,
                generation: 0,
            })),
        }
    }

    /// React to a session change. A reload failure is returned but the
    /// dashboard is still shown.
    pub async fn apply_session(&self, session: Option<AuthUser>) -> MarketResult<()> {
        let Some(user) = session else {
            self.reset_local();
            return Ok(());
        };

        let ctx = user.context();
        let generation = {
            let mut state = self.state.write();
            let switched_user = match &state.view {
                View::Dashboard { user: current } => current.id != user.id,
                View::Landing => false,
            };
            if switched_user {
                self.clear_files(&mut state);
            }
            info!(user_id = %user.id, "session started");
            state.view = View::Dashboard { user };
            state.generation += 1;
            state.generation
        };

        let files = match self.sync.rehydrate(&ctx).await {
            Ok(files) => files,
            Err(e) => {
                warn!(user_id = %ctx.uid(), error = %e, "reload failed, keeping current files");
                return Err(e);
            }
        };

        let state = self.state.read();
        if state.generation != generation {
            debug!(user_id = %ctx.uid(), "session changed during reload, dropping stored photos");
            return Ok(());
        }
        let added = self.files.lock().merge_remote(files);
        debug!(user_id = %ctx.uid(), added, "reloaded stored photos");
        Ok(())
    }

    /// Apply the provider's current session, then every change until the
    /// provider goes away.
    pub async fn watch(&self, mut sessions: SessionReceiver) {
        let current = sessions.borrow_and_update().clone();
        self.apply_logged(current).await;

        while sessions.changed().await.is_ok() {
            let next = sessions.borrow_and_update().clone();
            self.apply_logged(next).await;
        }
        debug!("session channel closed");
    }

    /// Apply whatever session the provider reports right now
    pub async fn refresh(&self) -> MarketResult<()> {
        self.apply_session(self.services.identity.current_user()).await
    }

    /// Sign in through the provider's popup. An attempt still open after
    /// `auth.sign_in_timeout` is abandoned.
    pub async fn sign_in(&self, provider: SignInProvider) -> MarketResult<AuthUser> {
        let limit = self.services.config.auth.sign_in_timeout;
        let attempt = self.services.identity.sign_in(provider);
        let source = match tokio::time::timeout(limit, attempt).await {
            Ok(Ok(user)) => return Ok(user),
            Ok(Err(source)) => source,
            Err(_) => WedError::unavailable(format!(
                "sign-in did not complete within {}",
                humantime::format_duration(limit)
            ))
            .into_anyhow(),
        };
        warn!(error = %source, "sign-in failed");
        Err(MarketError::Auth { source })
    }

    /// Leave the dashboard immediately, then ask the provider to end the
    /// session. A provider failure is logged and returned; the local
    /// state is already cleared.
    pub async fn logout(&self) -> MarketResult<()> {
        self.reset_local();
        self.services.identity.sign_out().await.map_err(|source| {
            warn!(error = %source, "sign-out failed");
            MarketError::Auth { source }
        })
    }

    pub fn view(&self) -> View {
        self.state.read().view.clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        match &self.state.read().view {
            View::Dashboard { user } => Some(user.clone()),
            View::Landing => None,
        }
    }

    pub fn user_context(&self) -> MarketResult<UserContext> {
        self.current_user()
            .map(|u| u.context())
            .ok_or(MarketError::NotSignedIn)
    }

    /// Stage picked or dropped files. Returns the accepted ids.
    pub fn add_files<I>(&self, candidates: I) -> MarketResult<Vec<String>>
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let state = self.state.read();
        if state.view == View::Landing {
            return Err(MarketError::NotSignedIn);
        }
        Ok(self.files.lock().add_candidates(candidates))
    }

    pub async fn upload_pending(&self) -> MarketResult<Vec<(String, MarketResult<UploadOutcome>)>> {
        let ctx = self.user_context()?;
        Ok(self.sync.upload_pending(&ctx).await)
    }

    /// Remove a file locally, close the viewer if it showed it, and delete
    /// its remote copies once it has a storage path.
    pub async fn remove_file(&self, id: &str) -> MarketResult<Option<DeleteReport>> {
        let removed = self
            .files
            .lock()
            .remove(id)
            .ok_or_else(|| MarketError::UnknownFile(id.to_string()))?;
        self.annotator.reconcile();

        match removed.storage_path() {
            Some(path) => self.sync.delete(path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Newest listings for the landing page; empty when the fetch fails
    pub async fn landing_gallery(&self) -> Vec<ListingRecord> {
        match self.gallery.latest(self.services.config.gallery_size).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(error = %e, "landing gallery unavailable");
                Vec::new()
            }
        }
    }

    pub fn files(&self) -> Vec<StagedFile> {
        self.files.lock().iter().cloned().collect()
    }

    pub fn annotator(&self) -> &TagAnnotator {
        &self.annotator
    }

    pub fn upload_sync(&self) -> &UploadSync {
        &self.sync
    }

    async fn apply_logged(&self, session: Option<AuthUser>) {
        if let Err(e) = self.apply_session(session).await {
            debug!(error = %e, "session change applied with errors");
        }
    }

    fn reset_local(&self) {
        let mut state = self.state.write();
        if state.view != View::Landing {
            info!("session ended");
        }
        state.view = View::Landing;
        self.clear_files(&mut state);
    }

    /// Lock order is session state, then files.
    fn clear_files(&self, state: &mut SessionState) {
        state.generation += 1;
        self.files.lock().clear();
        self.annotator.clear();
    }
}
