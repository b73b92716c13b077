//! # supernotes-gateway
//!
//! Clients for the hosted services SuperNotes delegates to:
//!
//! - [`FirestoreStore`]: document persistence over the Firestore REST API
//! - [`FirebaseAuth`]: email/password and federated sign-in over the
//!   Identity Toolkit REST API
//! - [`CloudinaryImageHost`]: unsigned image uploads
//!
//! plus [`MemoryAuthGateway`], an in-process identity gateway used by tests
//! and the offline backend.

pub mod cloudinary;
pub mod config;
pub mod error;
pub mod firebase_auth;
pub mod firestore;
pub mod memory_auth;

pub use cloudinary::CloudinaryImageHost;
pub use config::{CloudinaryConfig, FirebaseConfig};
pub use firebase_auth::FirebaseAuth;
pub use firestore::FirestoreStore;
pub use memory_auth::MemoryAuthGateway;
