//! Notes store: the signed-in user's cached notes and favorites.
//!
//! Follows identity changes from the [`EventBus`]. Every mutation goes to the
//! repository first and then re-fetches both collections, so the cache is
//! never edited locally.

use std::sync::Arc;

use supernotes_core::{
    validate_draft, validate_patch, Error, EventBus, EventEnvelope, ImageHost, ImageSource, Note,
    NoteDraft, NotePatch, NoteRepository, Result, SessionEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

const UPLOAD_FAILED: &str = "Failed to upload image. Please try again.";

/// Snapshot of the notes cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesState {
    pub user_id: Option<String>,
    pub notes: Vec<Note>,
    pub favorites: Vec<Note>,
    pub loading: bool,
    pub error: Option<String>,
}

struct Inner {
    state: RwLock<NotesState>,
    repo: Arc<dyn NoteRepository>,
    images: Option<Arc<dyn ImageHost>>,
    bus: EventBus,
}

/// Process-wide notes container. Cheap to clone.
#[derive(Clone)]
pub struct NotesStore {
    inner: Arc<Inner>,
}

fn no_user() -> Error {
    Error::Unauthorized("No user logged in".to_string())
}

impl NotesStore {
    pub fn new(
        repo: Arc<dyn NoteRepository>,
        images: Option<Arc<dyn ImageHost>>,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(NotesState::default()),
                repo,
                images,
                bus,
            }),
        }
    }

    /// Spawn the bus listener.
    pub fn start(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut rx = self.inner.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => store.handle_event(&envelope).await,
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "Notes store lagged behind session events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn handle_event(&self, envelope: &EventEnvelope) {
        match &envelope.payload {
            SessionEvent::IdentityChanged { user_id } => self.switch_user(user_id.clone()).await,
            SessionEvent::AccountDeleted { .. } => self.switch_user(None).await,
            SessionEvent::ProfileUpdated { .. } => {}
        }
    }

    /// Point the cache at another user: clear it, then load notes and
    /// favorites for `Some(uid)`.
    pub async fn switch_user(&self, user_id: Option<String>) {
        {
            let mut state = self.inner.state.write().await;
            if state.user_id == user_id {
                return;
            }
            debug!(
                subsystem = "session",
                component = "notes_store",
                user_id = user_id.as_deref().unwrap_or_default(),
                "Switching notes cache"
            );
            *state = NotesState {
                user_id: user_id.clone(),
                ..NotesState::default()
            };
        }
        if user_id.is_some() {
            self.refresh().await;
        }
    }

    pub async fn state(&self) -> NotesState {
        self.inner.state.read().await.clone()
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.inner.state.read().await.notes.clone()
    }

    pub async fn favorites(&self) -> Vec<Note> {
        self.inner.state.read().await.favorites.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    async fn user_id(&self) -> Option<String> {
        self.inner.state.read().await.user_id.clone()
    }

    async fn require_user(&self) -> Result<String> {
        self.user_id().await.ok_or_else(no_user)
    }

    async fn set_error(&self, err: &Error) {
        self.inner.state.write().await.error = Some(err.user_message());
    }

    async fn clear_error(&self) {
        self.inner.state.write().await.error = None;
    }

    /// Run a read, tracking `loading` and recording a failure in `error`.
    async fn load<F, Fut>(&self, user_id: &str, read: F) -> Result<Vec<Note>>
    where
        F: FnOnce(Arc<dyn NoteRepository>, String) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Note>>>,
    {
        {
            let mut state = self.inner.state.write().await;
            state.loading = true;
            state.error = None;
        }
        let result = read(self.inner.repo.clone(), user_id.to_string()).await;
        let mut state = self.inner.state.write().await;
        state.loading = false;
        if let Err(e) = &result {
            state.error = Some(e.user_message());
        }
        result
    }

    /// Reload the note list. Without a user this is a no-op.
    #[instrument(skip(self), fields(subsystem = "session", component = "notes_store", op = "fetch_notes"))]
    pub async fn fetch_notes(&self) -> Result<()> {
        let Some(uid) = self.user_id().await else {
            return Ok(());
        };
        let notes = self
            .load(&uid, |repo, uid| async move { repo.list_notes(&uid).await })
            .await?;
        let mut state = self.inner.state.write().await;
        // Dropped if the user changed mid-flight.
        if state.user_id.as_deref() == Some(uid.as_str()) {
            state.notes = notes;
        }
        Ok(())
    }

    /// Reload favorites. Without a user this is a no-op.
    #[instrument(skip(self), fields(subsystem = "session", component = "notes_store", op = "fetch_favorites"))]
    pub async fn fetch_favorites(&self) -> Result<()> {
        let Some(uid) = self.user_id().await else {
            return Ok(());
        };
        let favorites = self
            .load(&uid, |repo, uid| async move { repo.list_favorites(&uid).await })
            .await?;
        let mut state = self.inner.state.write().await;
        if state.user_id.as_deref() == Some(uid.as_str()) {
            state.favorites = favorites;
        }
        Ok(())
    }

    /// Reload both collections. Failures stay in `error`.
    async fn refresh(&self) {
        if let Err(e) = self.fetch_notes().await {
            debug!(error = %e, "Notes refresh failed");
        }
        if let Err(e) = self.fetch_favorites().await {
            debug!(error = %e, "Favorites refresh failed");
        }
    }

    /// Validate, create, and refresh. Returns the new note's id.
    #[instrument(skip(self, draft), fields(subsystem = "session", component = "notes_store", op = "create_note"))]
    pub async fn create_note(&self, draft: NoteDraft) -> Result<String> {
        let uid = self.require_user().await?;
        if let Err(e) = validate_draft(&draft) {
            self.set_error(&e).await;
            return Err(e);
        }
        self.clear_error().await;
        let note_id = match self.inner.repo.create(&uid, draft).await {
            Ok(id) => id,
            Err(e) => {
                self.set_error(&e).await;
                return Err(e);
            }
        };
        self.refresh().await;
        Ok(note_id)
    }

    #[instrument(skip(self, patch), fields(subsystem = "session", component = "notes_store", op = "update_note"))]
    pub async fn update_note(&self, note_id: &str, patch: NotePatch) -> Result<()> {
        self.require_user().await?;
        if let Err(e) = validate_patch(&patch) {
            self.set_error(&e).await;
            return Err(e);
        }
        self.clear_error().await;
        if let Err(e) = self.inner.repo.update(note_id, patch).await {
            self.set_error(&e).await;
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "session", component = "notes_store", op = "delete_note"))]
    pub async fn delete_note(&self, note_id: &str) -> Result<()> {
        self.require_user().await?;
        self.clear_error().await;
        if let Err(e) = self.inner.repo.delete(note_id).await {
            self.set_error(&e).await;
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    /// Flip the favorite flag. Returns the new value.
    #[instrument(skip(self), fields(subsystem = "session", component = "notes_store", op = "toggle_favorite"))]
    pub async fn toggle_favorite(&self, note_id: &str) -> Result<bool> {
        self.require_user().await?;
        self.clear_error().await;
        let is_favorite = match self.inner.repo.toggle_favorite(note_id).await {
            Ok(value) => value,
            Err(e) => {
                self.set_error(&e).await;
                return Err(e);
            }
        };
        self.refresh().await;
        Ok(is_favorite)
    }

    #[instrument(skip(self), fields(subsystem = "session", component = "notes_store", op = "set_favorite"))]
    pub async fn set_favorite(&self, note_id: &str, is_favorite: bool) -> Result<()> {
        self.require_user().await?;
        self.clear_error().await;
        if let Err(e) = self.inner.repo.set_favorite(note_id, is_favorite).await {
            self.set_error(&e).await;
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }

    /// Load one note for the detail view.
    pub async fn fetch_note(&self, note_id: &str) -> Result<Note> {
        self.require_user().await?;
        match self.inner.repo.fetch(note_id).await {
            Ok(note) => Ok(note),
            Err(e) => {
                self.set_error(&e).await;
                Err(e)
            }
        }
    }

    /// Search the user's notes. Failures yield an empty list.
    pub async fn search(&self, term: &str) -> Vec<Note> {
        let Some(uid) = self.user_id().await else {
            return Vec::new();
        };
        self.clear_error().await;
        match self.inner.repo.search(&uid, term).await {
            Ok(notes) => notes,
            Err(e) => {
                self.set_error(&e).await;
                Vec::new()
            }
        }
    }

    /// Notes in one category. Failures yield an empty list.
    pub async fn notes_by_category(&self, category: &str) -> Vec<Note> {
        let Some(uid) = self.user_id().await else {
            return Vec::new();
        };
        self.clear_error().await;
        match self.inner.repo.list_by_category(&uid, category).await {
            Ok(notes) => notes,
            Err(e) => {
                self.set_error(&e).await;
                Vec::new()
            }
        }
    }

    /// Upload an image and return its public URL, for use as a note image.
    #[instrument(skip(self, image), fields(subsystem = "session", component = "notes_store", op = "upload_image"))]
    pub async fn upload_image(&self, image: ImageSource) -> Result<String> {
        self.require_user().await?;
        let Some(images) = self.inner.images.clone() else {
            let err = Error::Config("Image uploads are not configured".to_string());
            self.set_error(&err).await;
            return Err(err);
        };
        match images.upload(image).await {
            Ok(url) => {
                info!("Image uploaded for note");
                Ok(url)
            }
            // Rejected before upload; the message is already specific.
            Err(e @ Error::InvalidInput(_)) => {
                self.set_error(&e).await;
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "Image upload failed");
                let err = Error::failed(UPLOAD_FAILED, e);
                self.set_error(&err).await;
                Err(err)
            }
        }
    }
}
