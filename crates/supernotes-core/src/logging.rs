//! Structured logging schema and field name constants for SuperNotes.
//!
//! The reference list of structured logging field names. The `tracing`
//! macros take field names as identifiers, so call sites spell these names
//! directly (`subsystem = "db"`, `op = "create_note"`).
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A data-access or gateway call failed and the error is being surfaced |
//! | WARN  | Recoverable issue, e.g. a lagging event subscriber |
//! | INFO  | Lifecycle events (startup, sign-in, sign-out), mutations completed |
//! | DEBUG | Reads completed, config choices, event emission |
//! | TRACE | Per-document decoding |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "gateway", "session", "app"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "notes", "users", "firestore", "firebase_auth", "cloudinary"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "list_notes", "create_note", "sign_in", "upload"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Authenticated user (identity id).
pub const USER_ID: &str = "user_id";

/// Note document id.
pub const NOTE_ID: &str = "note_id";

/// Document collection.
pub const COLLECTION: &str = "collection";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// HTTP status code returned by a hosted backend.
pub const HTTP_STATUS: &str = "http_status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
