//! Domain models for SuperNotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_CATEGORY, PREVIEW_CHARS, PREVIEW_ELLIPSIS};

/// Stored field names of `notes` and `users` documents.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const PREVIEW: &str = "preview";
    pub const CATEGORY: &str = "category";
    pub const TAGS: &str = "tags";
    pub const IMAGE: &str = "image";
    pub const IS_FAVORITE: &str = "isFavorite";
    pub const USER_ID: &str = "userId";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";

    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const AVATAR: &str = "avatar";
}

// =============================================================================
// NOTES
// =============================================================================

/// A user-owned note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Derived from `content` at last write, see [`compute_preview`].
    pub preview: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Composition-form payload for creating a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl NoteDraft {
    /// Draft with the default category, no image, no tags, not a favorite.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            image: None,
            is_favorite: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }
}

/// Partial update of a note. `None` fields are left untouched.
///
/// `image` is doubly optional: `Some(None)` removes the image,
/// `Some(Some(url))` replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

impl NotePatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn image(mut self, url: Option<String>) -> Self {
        self.image = Some(url);
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = Some(is_favorite);
        self
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.image.is_none()
            && self.is_favorite.is_none()
    }
}

/// Sort order for note listings. Both are newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSort {
    #[default]
    UpdatedAt,
    CreatedAt,
}

impl NoteSort {
    /// Stored field the sort applies to.
    pub fn field(self) -> &'static str {
        match self {
            NoteSort::UpdatedAt => fields::UPDATED_AT,
            NoteSort::CreatedAt => fields::CREATED_AT,
        }
    }
}

/// Preview of note content: the first [`PREVIEW_CHARS`] characters plus an
/// ellipsis when the content is longer, otherwise the content itself.
///
/// Counts Unicode scalar values, so multi-byte text is never split.
pub fn compute_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}{}", &content[..cut], PREVIEW_ELLIPSIS),
        None => content.to_string(),
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Profile record mirrored from the auth identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Equal to the auth identity id.
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile edit. Email and creation time are not editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none()
    }

    /// Apply the patch to a cached profile.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = Some(avatar.clone());
        }
    }
}

/// How an identity authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Password,
    Google,
}

impl AuthProvider {
    /// Provider id used by the identity gateway.
    pub fn provider_id(self) -> &'static str {
        match self {
            AuthProvider::Password => "password",
            AuthProvider::Google => "google.com",
        }
    }
}

/// Principal issued by the identity gateway.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider: AuthProvider,
    /// Bearer token for the hosted database. Empty for in-memory gateways.
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("provider", &self.provider)
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Result of a federated sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedSignIn {
    pub identity: AuthIdentity,
    /// True the first time this federated account signs in.
    pub is_new_user: bool,
}

// =============================================================================
// IMAGES
// =============================================================================

/// Image to upload to the image host.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Raw file bytes, as picked from the device.
    Bytes {
        file_name: String,
        data: Vec<u8>,
    },
    /// A `data:image/...;base64,...` URL, passed through to the host verbatim.
    DataUrl(String),
}
