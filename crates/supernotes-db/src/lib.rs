//! # supernotes-db
//!
//! Data-access layer for SuperNotes.
//!
//! This crate provides:
//! - `DocumentNoteRepository`: note CRUD, favorites, category and search queries
//! - `GatewayUserRepository`: registration, sign-in, profiles, account deletion
//! - `MemoryDocumentStore`: in-process document store for offline use and tests
//! - Document codecs that normalize sparse records on read
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use supernotes_db::{DataLayer, MemoryDocumentStore, NoteDraft, NoteRepository};
//!
//! let store = Arc::new(MemoryDocumentStore::new());
//! let data = DataLayer::new(store, auth);
//! let id = data.notes.create("uid-1", NoteDraft::new("Hello", "World")).await?;
//! ```
pub mod codec;
pub mod memory;
pub mod notes;
pub mod users;

use std::sync::Arc;

// Re-export core types
pub use supernotes_core::*;

pub use memory::MemoryDocumentStore;
pub use notes::DocumentNoteRepository;
pub use users::GatewayUserRepository;

/// Combined data-access context with both repositories.
#[derive(Clone)]
pub struct DataLayer {
    pub notes: Arc<DocumentNoteRepository>,
    pub users: Arc<GatewayUserRepository>,
}

impl DataLayer {
    /// Build both repositories over one store and identity gateway.
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthGateway>) -> Self {
        let notes = Arc::new(DocumentNoteRepository::new(store.clone()));
        let users = Arc::new(GatewayUserRepository::new(auth, store, notes.clone()));
        Self { notes, users }
    }
}
