//! Note data-access layer over a [`DocumentStore`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use supernotes_core::defaults::NOTES_COLLECTION;
use supernotes_core::{
    fields, matches_term, DocumentStore, Error, FieldValue, Fields, Note, NoteDraft, NotePatch,
    NoteRepository, NoteSort, Query, Result, SortDirection,
};
use tracing::{debug, error, info, instrument};

use crate::codec::{draft_to_fields, note_from_document, patch_to_fields};

const FETCH_NOTES_FAILED: &str =
    "Failed to fetch notes. Please check your connection and try again.";
const FETCH_FAVORITES_FAILED: &str =
    "Failed to fetch favorite notes. Please check your connection and try again.";
const FETCH_CATEGORY_FAILED: &str =
    "Failed to fetch notes by category. Please check your connection and try again.";
const SEARCH_FAILED: &str = "Failed to search notes. Please try again.";
const FETCH_NOTE_FAILED: &str = "Failed to load note. Please try again.";
const CREATE_FAILED: &str = "Failed to create note. Please try again.";
const UPDATE_FAILED: &str = "Failed to update note. Please try again.";
const DELETE_FAILED: &str = "Failed to delete note. Please try again.";
const FAVORITE_FAILED: &str = "Failed to update favorite status. Please try again.";
const DELETE_ALL_FAILED: &str = "Failed to delete notes. Please try again.";

/// Log a failed operation and wrap it with its user-facing message.
fn failed(op: &'static str, message: &'static str, start: Instant, err: Error) -> Error {
    error!(
        subsystem = "db",
        component = "notes",
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        error = %err,
        "Note operation failed"
    );
    Error::failed(message, err)
}

/// [`NoteRepository`] backed by any [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentNoteRepository {
    store: Arc<dyn DocumentStore>,
}

impl DocumentNoteRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn owned_by(user_id: &str) -> Query {
        Query::collection(NOTES_COLLECTION).where_eq(fields::USER_ID, user_id)
    }

    async fn run(&self, query: Query) -> Result<Vec<Note>> {
        let docs = self.store.query(&query).await?;
        Ok(docs.iter().map(note_from_document).collect())
    }

    async fn read_favorite(&self, note_id: &str) -> Result<bool> {
        let doc = self
            .store
            .get(NOTES_COLLECTION, note_id)
            .await?
            .ok_or_else(|| Error::NoteNotFound(note_id.to_string()))?;
        Ok(doc.get_bool(fields::IS_FAVORITE).unwrap_or(false))
    }

    async fn write_favorite(&self, note_id: &str, is_favorite: bool) -> Result<()> {
        let mut update = Fields::new();
        update.insert(fields::IS_FAVORITE.to_string(), is_favorite.into());
        update.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
        self.store.update(NOTES_COLLECTION, note_id, update).await
    }
}

#[async_trait]
impl NoteRepository for DocumentNoteRepository {
    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "list_notes"))]
    async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = Self::owned_by(user_id).order_by(fields::UPDATED_AT, SortDirection::Descending);
        let notes = self
            .run(query)
            .await
            .map_err(|e| failed("list_notes", FETCH_NOTES_FAILED, start, e))?;
        debug!(
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Notes fetched"
        );
        Ok(notes)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "list_notes_sorted"))]
    async fn list_notes_sorted(&self, user_id: &str, sort: NoteSort) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = Self::owned_by(user_id).order_by(sort.field(), SortDirection::Descending);
        let notes = self
            .run(query)
            .await
            .map_err(|e| failed("list_notes_sorted", FETCH_NOTES_FAILED, start, e))?;
        debug!(
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Notes fetched"
        );
        Ok(notes)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "list_favorites"))]
    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = Self::owned_by(user_id)
            .where_eq(fields::IS_FAVORITE, true)
            .order_by(fields::UPDATED_AT, SortDirection::Descending);
        let notes = self
            .run(query)
            .await
            .map_err(|e| failed("list_favorites", FETCH_FAVORITES_FAILED, start, e))?;
        debug!(
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Favorite notes fetched"
        );
        Ok(notes)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "list_by_category"))]
    async fn list_by_category(&self, user_id: &str, category: &str) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = Self::owned_by(user_id)
            .where_eq(fields::CATEGORY, category)
            .order_by(fields::UPDATED_AT, SortDirection::Descending);
        let notes = self
            .run(query)
            .await
            .map_err(|e| failed("list_by_category", FETCH_CATEGORY_FAILED, start, e))?;
        debug!(
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Category notes fetched"
        );
        Ok(notes)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "search"))]
    async fn search(&self, user_id: &str, term: &str) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = Self::owned_by(user_id).order_by(fields::UPDATED_AT, SortDirection::Descending);
        let all = self
            .run(query)
            .await
            .map_err(|e| failed("search", SEARCH_FAILED, start, e))?;
        let scanned = all.len();
        let hits: Vec<Note> = all.into_iter().filter(|n| matches_term(n, term)).collect();
        debug!(
            scanned,
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note search complete"
        );
        Ok(hits)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "fetch"))]
    async fn fetch(&self, note_id: &str) -> Result<Note> {
        let start = Instant::now();
        let doc = self
            .store
            .get(NOTES_COLLECTION, note_id)
            .await
            .map_err(|e| failed("fetch", FETCH_NOTE_FAILED, start, e))?
            .ok_or_else(|| Error::NoteNotFound(note_id.to_string()))?;
        Ok(note_from_document(&doc))
    }

    #[instrument(skip(self, draft), fields(subsystem = "db", component = "notes", op = "create_note"))]
    async fn create(&self, user_id: &str, draft: NoteDraft) -> Result<String> {
        let start = Instant::now();
        let note_id = self
            .store
            .add(NOTES_COLLECTION, draft_to_fields(user_id, draft))
            .await
            .map_err(|e| failed("create_note", CREATE_FAILED, start, e))?;
        info!(
            note_id = %note_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note created"
        );
        Ok(note_id)
    }

    #[instrument(skip(self, patch), fields(subsystem = "db", component = "notes", op = "update_note"))]
    async fn update(&self, note_id: &str, patch: NotePatch) -> Result<()> {
        let start = Instant::now();
        self.store
            .update(NOTES_COLLECTION, note_id, patch_to_fields(patch))
            .await
            .map_err(|e| failed("update_note", UPDATE_FAILED, start, e))?;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Note updated"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "delete_note"))]
    async fn delete(&self, note_id: &str) -> Result<()> {
        let start = Instant::now();
        self.store
            .delete(NOTES_COLLECTION, note_id)
            .await
            .map_err(|e| failed("delete_note", DELETE_FAILED, start, e))?;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Note deleted"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "set_favorite"))]
    async fn set_favorite(&self, note_id: &str, is_favorite: bool) -> Result<()> {
        let start = Instant::now();
        self.write_favorite(note_id, is_favorite)
            .await
            .map_err(|e| failed("set_favorite", FAVORITE_FAILED, start, e))?;
        info!(
            is_favorite,
            duration_ms = start.elapsed().as_millis() as u64,
            "Favorite flag set"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "toggle_favorite"))]
    async fn toggle_favorite(&self, note_id: &str) -> Result<bool> {
        let start = Instant::now();
        let current = self
            .read_favorite(note_id)
            .await
            .map_err(|e| failed("toggle_favorite", FAVORITE_FAILED, start, e))?;
        let next = !current;
        self.write_favorite(note_id, next)
            .await
            .map_err(|e| failed("toggle_favorite", FAVORITE_FAILED, start, e))?;
        info!(
            is_favorite = next,
            duration_ms = start.elapsed().as_millis() as u64,
            "Favorite toggled"
        );
        Ok(next)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "delete_all_for_user"))]
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let start = Instant::now();
        let docs = self
            .store
            .query(&Self::owned_by(user_id))
            .await
            .map_err(|e| failed("delete_all_for_user", DELETE_ALL_FAILED, start, e))?;
        let mut removed = 0;
        for doc in &docs {
            match self.store.delete(NOTES_COLLECTION, &doc.id).await {
                Ok(()) => removed += 1,
                // Already gone, e.g. deleted from another device.
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(failed("delete_all_for_user", DELETE_ALL_FAILED, start, e)),
            }
        }
        info!(
            result_count = removed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Deleted all notes for user"
        );
        Ok(removed)
    }
}
