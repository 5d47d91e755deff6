//! Gallery/tag annotator.
//!
//! One image is selected at a time. Selecting issues a [`FetchTicket`]; a
//! tag fetch only lands if its ticket still matches the current selection,
//! so a slow fetch for a previous image never overwrites the panel.
//!
//! Tags are keyed by the staged file id (`imageId`), which is also the
//! storage object name and therefore survives a reload.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use wed_core::UserContext;
use wed_docs::{DocumentStore, Query};

use crate::error::{MarketError, MarketResult};
use crate::records::TagRecord;
use crate::staging::{SharedFiles, UploadState};

/// Rendered image box at click time, in client pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Image-local position of a client point, if it lands inside the box
    pub fn locate(&self, client_x: f64, client_y: f64) -> Option<PendingMarker> {
        let x = client_x - self.left;
        let y = client_y - self.top;
        ((0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y))
            .then_some(PendingMarker { x, y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click {
    /// Click on the image surface, in client coordinates
    Image {
        client_x: f64,
        client_y: f64,
        bounds: Bounds,
    },
    /// Click on an existing marker of the selected image
    Marker { index: usize },
}

/// Unsaved marker position, image-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingMarker {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickResult {
    /// A marker is pending and the form is open
    Placing(PendingMarker),
    /// An existing marker was disclosed; nothing was placed
    Disclosed(TagRecord),
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagPhase {
    NoSelection,
    Selected { image_id: String },
    Placing { image_id: String, marker: PendingMarker },
}

/// Identifies the selection a tag fetch was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub image_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The selection moved on before the fetch resolved; result dropped
    Stale,
}

#[derive(Default)]
struct AnnotatorState {
    generation: u64,
    selected: Option<String>,
    pending: Option<PendingMarker>,
    tags: HashMap<String, Vec<TagRecord>>,
}

impl AnnotatorState {
    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation == ticket.generation
            && self.selected.as_deref() == Some(ticket.image_id.as_str())
    }

    fn deselect(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.pending = None;
    }
}

#[derive(Clone)]
pub struct TagAnnotator {
    docs: Arc<dyn DocumentStore>,
    files: SharedFiles,
    state: Arc<Mutex<AnnotatorState>>,
    collection: String,
}

impl TagAnnotator {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        files: SharedFiles,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            docs,
            files,
            state: Arc::new(Mutex::new(AnnotatorState::default())),
            collection: collection.into(),
        }
    }

    /// Select a staged file that is not mid-upload. Clears any pending
    /// marker; the returned ticket must be passed to [`load_tags`].
    ///
    /// [`load_tags`]: TagAnnotator::load_tags
    pub fn select(&self, id: &str) -> MarketResult<FetchTicket> {
        let upload_state = self
            .files
            .lock()
            .get(id)
            .map(|f| f.upload_state())
            .ok_or_else(|| MarketError::UnknownFile(id.to_string()))?;
        if upload_state == UploadState::Uploading {
            return Err(MarketError::NotSelectable {
                id: id.to_string(),
                state: upload_state,
            });
        }

        let mut state = self.state.lock();
        state.generation += 1;
        state.selected = Some(id.to_string());
        state.pending = None;
        Ok(FetchTicket {
            generation: state.generation,
            image_id: id.to_string(),
        })
    }

    /// Fetch the user's tags for the ticket's image.
    pub async fn load_tags(
        &self,
        user: &UserContext,
        ticket: &FetchTicket,
    ) -> MarketResult<LoadOutcome> {
        let query = Query::new()
            .where_eq("userId", user.uid())
            .where_eq("imageId", ticket.image_id.as_str());
        let result = self.docs.query(&self.collection, query).await;

        let mut state = self.state.lock();
        if !state.is_current(ticket) {
            debug!(image_id = %ticket.image_id, "discarding stale tag fetch");
            return Ok(LoadOutcome::Stale);
        }

        let docs = match result {
            Ok(docs) => docs,
            Err(e) => {
                warn!(image_id = %ticket.image_id, error = %e, "tag fetch failed");
                return Err(MarketError::fetch("tags", e));
            }
        };

        let mut fetched = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.decode::<TagRecord>() {
                Ok(mut tag) => {
                    tag.id = doc.id().to_string();
                    fetched.push(tag);
                }
                Err(e) => warn!(doc = %doc.id(), error = %e, "skipping malformed tag"),
            }
        }

        // Keep tags saved locally since the fetch was issued.
        let entry = state.tags.entry(ticket.image_id.clone()).or_default();
        let local: Vec<TagRecord> = entry
            .drain(..)
            .filter(|t| !fetched.iter().any(|f| f.id == t.id))
            .collect();
        fetched.extend(local);
        let count = fetched.len();
        *entry = fetched;
        Ok(LoadOutcome::Loaded(count))
    }

    /// Select and load in one step
    pub async fn open(&self, user: &UserContext, id: &str) -> MarketResult<LoadOutcome> {
        let ticket = self.select(id)?;
        self.load_tags(user, &ticket).await
    }

    pub fn click(&self, click: Click) -> MarketResult<ClickResult> {
        let mut state = self.state.lock();
        let Some(image_id) = state.selected.clone() else {
            return Err(MarketError::NoSelection);
        };

        match click {
            Click::Image {
                client_x,
                client_y,
                bounds,
            } => match bounds.locate(client_x, client_y) {
                Some(marker) => {
                    state.pending = Some(marker);
                    Ok(ClickResult::Placing(marker))
                }
                None => {
                    debug!(image_id = %image_id, client_x, client_y, "click outside the image");
                    Ok(ClickResult::Ignored)
                }
            },
            Click::Marker { index } => Ok(state
                .tags
                .get(&image_id)
                .and_then(|tags| tags.get(index))
                .cloned()
                .map(ClickResult::Disclosed)
                .unwrap_or(ClickResult::Ignored)),
        }
    }

    /// Persist the pending marker. A blank description saves nothing and
    /// keeps the form open; a blank price is stored as absent.
    pub async fn confirm(
        &self,
        user: &UserContext,
        description: &str,
        price: &str,
    ) -> MarketResult<Option<TagRecord>> {
        let description = description.trim();
        if description.is_empty() {
            return Ok(None);
        }
        let price = Some(price.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let (image_id, marker, generation) = {
            let state = self.state.lock();
            let image_id = state.selected.clone().ok_or(MarketError::NoSelection)?;
            let Some(marker) = state.pending else {
                return Ok(None);
            };
            (image_id, marker, state.generation)
        };

        let mut tag = TagRecord {
            id: String::new(),
            x: marker.x,
            y: marker.y,
            description: description.to_string(),
            price,
            user_id: user.uid().to_string(),
            image_id: image_id.clone(),
        };
        tag.id = self
            .docs
            .add(&self.collection, tag.to_document()?)
            .await
            .map_err(|e| {
                warn!(image_id = %image_id, error = %e, "tag write failed");
                MarketError::write("tag", e)
            })?;

        let mut state = self.state.lock();
        state
            .tags
            .entry(image_id.clone())
            .or_default()
            .push(tag.clone());
        if state.generation == generation && state.pending == Some(marker) {
            state.pending = None;
        }
        info!(image_id = %image_id, tag = %tag.id, "tag saved");
        Ok(Some(tag))
    }

    /// Drop the pending marker without saving
    pub fn cancel(&self) {
        self.state.lock().pending = None;
    }

    /// Deselect if the selected file left the staged collection. Returns
    /// true when the selection was cleared.
    pub fn reconcile(&self) -> bool {
        let selected = self.state.lock().selected.clone();
        let Some(id) = selected else {
            return false;
        };
        if self.files.lock().contains(&id) {
            return false;
        }

        let mut state = self.state.lock();
        if state.selected.as_deref() != Some(id.as_str()) {
            return false;
        }
        state.deselect();
        state.tags.remove(&id);
        debug!(image_id = %id, "selected image removed, closing viewer");
        true
    }

    /// Forget every selection and cached tag
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.deselect();
        state.tags.clear();
    }

    pub fn phase(&self) -> TagPhase {
        let state = self.state.lock();
        match (&state.selected, state.pending) {
            (None, _) => TagPhase::NoSelection,
            (Some(id), None) => TagPhase::Selected {
                image_id: id.clone(),
            },
            (Some(id), Some(marker)) => TagPhase::Placing {
                image_id: id.clone(),
                marker,
            },
        }
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().selected.clone()
    }

    /// Tags of the selected image, as shown in the panel
    pub fn visible_tags(&self) -> Vec<TagRecord> {
        let state = self.state.lock();
        state
            .selected
            .as_ref()
            .and_then(|id| state.tags.get(id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for(&self, image_id: &str) -> Vec<TagRecord> {
        self.state
            .lock()
            .tags
            .get(image_id)
            .cloned()
            .unwrap_or_default()
    }
}
