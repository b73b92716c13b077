//! # supernotes-session
//!
//! The two process-wide state containers:
//!
//! - [`SessionStore`]: identity and profile, driven by the identity gateway
//! - [`NotesStore`]: cached notes and favorites for the signed-in user
//!
//! They never reference each other. The session store publishes identity
//! changes on the shared [`EventBus`](supernotes_core::EventBus) and the notes
//! store reacts to them.

pub mod notes;
pub mod session;

pub use notes::{NotesState, NotesStore};
pub use session::{SessionState, SessionStatus, SessionStore};
