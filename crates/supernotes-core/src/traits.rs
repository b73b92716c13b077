//! Core traits for SuperNotes abstractions.
//!
//! The gateway traits (`DocumentStore`, `AuthGateway`, `ImageHost`) are
//! implemented by the hosted-service clients and by in-memory doubles. The
//! repository traits (`NoteRepository`, `UserRepository`) are the data-access
//! layer the state containers call.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::document::{Document, Fields, Query};
use crate::error::Result;
use crate::models::*;

// =============================================================================
// PERSISTENCE GATEWAY
// =============================================================================

/// Collection-scoped document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document under a generated id and return the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Create or replace a document under a known id.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Read a document. `Ok(None)` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Merge `fields` into an existing document. `Error::NotFound` when absent.
    ///
    /// A field set to [`FieldValue::Null`](crate::FieldValue::Null) is removed.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Remove a document. `Error::NotFound` when absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Run a filtered, optionally sorted query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;
}

/// Supplies the bearer token attached to database requests.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when signed out.
    fn bearer_token(&self) -> Option<String>;
}

// =============================================================================
// IDENTITY GATEWAY
// =============================================================================

/// Hosted authentication service.
///
/// Every successful sign-in/sign-up and every sign-out or deletion updates
/// the identity watch returned by [`subscribe`](AuthGateway::subscribe).
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create an email/password identity and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity>;

    /// Authenticate with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity>;

    /// Exchange a third-party id token for a local identity.
    async fn sign_in_with_idp(
        &self,
        provider: AuthProvider,
        id_token: &str,
    ) -> Result<FederatedSignIn>;

    /// Set the display name on the signed-in identity.
    async fn update_display_name(&self, name: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// Permanently delete the signed-in identity and sign out.
    async fn delete_current(&self) -> Result<()>;

    /// Identity currently signed in.
    fn current(&self) -> Option<AuthIdentity>;

    /// Identity-change notifications. The receiver sees the current value
    /// immediately, then every transition.
    fn subscribe(&self) -> watch::Receiver<Option<AuthIdentity>>;
}

// =============================================================================
// IMAGE HOSTING
// =============================================================================

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return its permanent public URL.
    async fn upload(&self, image: ImageSource) -> Result<String>;
}

// =============================================================================
// DATA-ACCESS LAYER
// =============================================================================

/// Note operations scoped to one owner.
///
/// Implementations do not validate input; callers run
/// [`validate_draft`](crate::validate_draft) / [`validate_patch`](crate::validate_patch) first.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// The user's notes, most recently updated first.
    async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>>;

    /// The user's notes, newest first by the given timestamp.
    async fn list_notes_sorted(&self, user_id: &str, sort: NoteSort) -> Result<Vec<Note>>;

    /// The user's favorite notes, most recently updated first.
    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Note>>;

    /// The user's notes in one category, most recently updated first.
    async fn list_by_category(&self, user_id: &str, category: &str) -> Result<Vec<Note>>;

    /// Case-insensitive substring search over title, content and tags.
    async fn search(&self, user_id: &str, term: &str) -> Result<Vec<Note>>;

    /// A single note. `Error::NoteNotFound` when absent.
    async fn fetch(&self, note_id: &str) -> Result<Note>;

    /// Insert a note and return its id.
    async fn create(&self, user_id: &str, draft: NoteDraft) -> Result<String>;

    /// Apply a partial update.
    async fn update(&self, note_id: &str, patch: NotePatch) -> Result<()>;

    /// Permanently delete a note.
    async fn delete(&self, note_id: &str) -> Result<()>;

    async fn set_favorite(&self, note_id: &str, is_favorite: bool) -> Result<()>;

    /// Flip the favorite flag and return the new value.
    async fn toggle_favorite(&self, note_id: &str) -> Result<bool>;

    /// Delete every note owned by the user. Returns the number removed.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<usize>;
}

/// Identity and profile operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an identity, set its display name, and create its profile.
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<User>;

    /// Authenticate and load the profile. `Error::ProfileNotFound` when the
    /// identity has no profile; the identity is signed out again in that case.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Federated sign-in. Creates the profile on first sign-in only.
    async fn sign_in_federated(&self, provider: AuthProvider, id_token: &str) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;

    /// Profile by id. `Ok(None)` when absent.
    async fn get_profile(&self, user_id: &str) -> Result<Option<User>>;

    /// Merge name/avatar into the profile.
    async fn update_profile(&self, user_id: &str, patch: &UserPatch) -> Result<()>;

    /// Delete the user's notes, profile, and identity, in that order.
    async fn delete_account(&self, user_id: &str) -> Result<()>;
}
