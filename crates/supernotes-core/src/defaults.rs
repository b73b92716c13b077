//! Centralized default constants for the SuperNotes client.
//!
//! All crates should reference these constants instead of defining their own
//! magic numbers. Organized by domain area.

// =============================================================================
// COLLECTIONS
// =============================================================================

/// Document collection holding notes.
pub const NOTES_COLLECTION: &str = "notes";

/// Document collection holding user profiles (keyed by identity id).
pub const USERS_COLLECTION: &str = "users";

// =============================================================================
// NOTES
// =============================================================================

/// Number of content characters kept in a preview before truncation.
pub const PREVIEW_CHARS: usize = 100;

/// Marker appended to a truncated preview.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Category used when a note has none.
pub const DEFAULT_CATEGORY: &str = "Personal";

/// Display name given to federated users whose identity carries none.
pub const DEFAULT_FEDERATED_NAME: &str = "User";

// =============================================================================
// FIELD LIMITS
// =============================================================================

pub const MAX_NOTE_TITLE_LEN: usize = 200;

pub const MAX_NOTE_CONTENT_LEN: usize = 10_000;

pub const MAX_CATEGORY_LEN: usize = 50;

pub const MAX_TAG_LEN: usize = 30;

pub const MAX_USER_NAME_LEN: usize = 100;

pub const MAX_USER_EMAIL_LEN: usize = 100;

// =============================================================================
// RUNTIME
// =============================================================================

/// Broadcast buffer for the session event bus.
///
/// Recommended: 64 for the app, 16 for tests.
pub const EVENT_BUS_CAPACITY: usize = 64;

/// HTTP request timeout for hosted backends, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// HOSTED BACKENDS
// =============================================================================

/// Firestore REST endpoint.
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore database id used when none is configured.
pub const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";

/// Identity Toolkit REST endpoint.
pub const DEFAULT_FIREBASE_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Cloudinary API root; the upload endpoint is `{root}/{cloud_name}/auto/upload`.
pub const DEFAULT_CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Unsigned upload preset.
pub const DEFAULT_CLOUDINARY_UPLOAD_PRESET: &str = "upload";

/// Destination folder for note images.
pub const DEFAULT_CLOUDINARY_FOLDER: &str = "supernotes";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Backend selection: `firebase` (default) or `memory`.
pub const ENV_BACKEND: &str = "SUPERNOTES_BACKEND";

pub const ENV_FIREBASE_API_KEY: &str = "FIREBASE_API_KEY";

pub const ENV_FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";

pub const ENV_FIRESTORE_DATABASE: &str = "FIRESTORE_DATABASE";

/// Overrides the Firestore endpoint (emulator).
pub const ENV_FIRESTORE_BASE_URL: &str = "FIRESTORE_BASE_URL";

/// Overrides the Identity Toolkit endpoint (emulator).
pub const ENV_FIREBASE_AUTH_BASE_URL: &str = "FIREBASE_AUTH_BASE_URL";

/// Enables image uploads when set.
pub const ENV_CLOUDINARY_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";

pub const ENV_CLOUDINARY_UPLOAD_PRESET: &str = "CLOUDINARY_UPLOAD_PRESET";

pub const ENV_CLOUDINARY_FOLDER: &str = "CLOUDINARY_FOLDER";

/// Full upload endpoint override.
pub const ENV_CLOUDINARY_UPLOAD_URL: &str = "CLOUDINARY_UPLOAD_URL";

pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SUPERNOTES_REQUEST_TIMEOUT_SECS";

pub const ENV_EVENT_BUS_CAPACITY: &str = "SUPERNOTES_EVENT_BUS_CAPACITY";
