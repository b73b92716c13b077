//! # supernotes-core
//!
//! Core types, traits, and abstractions for the SuperNotes client.
//!
//! This crate provides the note and profile data model, the document model
//! spoken by the persistence gateway, the gateway traits that the hosted
//! services implement, and the shared error, event and logging vocabulary
//! that the other SuperNotes crates depend on.

pub mod categories;
pub mod defaults;
pub mod document;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod search;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use categories::{Category, CATEGORY_PALETTE};
pub use document::{Document, FieldFilter, FieldValue, Fields, FilterOp, Query, SortDirection};
pub use error::{AuthFailure, Error, Result};
pub use events::{EventBus, EventEnvelope, SessionEvent};
pub use models::*;
pub use search::matches_term;
pub use traits::*;
pub use validation::{validate_credentials, validate_draft, validate_patch, validate_user_patch};
