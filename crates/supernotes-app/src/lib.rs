//! # supernotes-app
//!
//! Composition root for SuperNotes. [`App::build`] creates every client once
//! from an [`AppConfig`] and wires the repositories, the event bus and the two
//! state containers together. [`App::start`] spawns the listeners.
//!
//! ```rust,ignore
//! let config = AppConfig::from_env()?;
//! let _guard = init_tracing(&LogConfig::from_env())?;
//! let app = App::build(config)?;
//! app.start();
//! app.session.sign_in("ada@example.com", "secret1").await?;
//! ```

pub mod config;
pub mod logging;

use std::sync::Arc;

use supernotes_core::{AuthGateway, DocumentStore, EventBus, ImageHost, TokenProvider};
use supernotes_db::{DataLayer, MemoryDocumentStore};
use supernotes_gateway::{CloudinaryImageHost, FirebaseAuth, FirestoreStore, MemoryAuthGateway};
use supernotes_session::{NotesStore, SessionStore};
use tokio::task::JoinHandle;
use tracing::info;

pub use config::{AppConfig, Backend, ConfigError, ConfigResult};
pub use logging::{init_tracing, LogConfig};

/// Every long-lived object the UI layer talks to.
#[derive(Clone)]
pub struct App {
    pub backend: Backend,
    pub bus: EventBus,
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthGateway>,
    pub images: Option<Arc<dyn ImageHost>>,
    pub data: DataLayer,
    pub session: SessionStore,
    pub notes: NotesStore,
}

impl App {
    pub fn build(config: AppConfig) -> ConfigResult<Self> {
        let (store, auth): (Arc<dyn DocumentStore>, Arc<dyn AuthGateway>) = match config.backend {
            Backend::Firebase => {
                let firebase = config.firebase.clone().ok_or_else(|| {
                    supernotes_core::Error::Config("Firebase settings are missing".to_string())
                })?;
                let auth = Arc::new(FirebaseAuth::new(firebase.clone())?);
                let tokens: Arc<dyn TokenProvider> = auth.clone();
                let store: Arc<dyn DocumentStore> =
                    Arc::new(FirestoreStore::new(firebase, tokens)?);
                (store, auth as Arc<dyn AuthGateway>)
            }
            Backend::Memory => {
                let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
                let auth: Arc<dyn AuthGateway> = Arc::new(MemoryAuthGateway::new());
                (store, auth)
            }
        };

        let images = match config.cloudinary.clone() {
            Some(cloudinary) => {
                Some(Arc::new(CloudinaryImageHost::new(cloudinary)?) as Arc<dyn ImageHost>)
            }
            None => None,
        };

        Ok(Self::assemble(config.backend, config.event_bus_capacity, store, auth, images))
    }

    /// Wire the stores over already-built clients.
    pub fn assemble(
        backend: Backend,
        event_bus_capacity: usize,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthGateway>,
        images: Option<Arc<dyn ImageHost>>,
    ) -> Self {
        let bus = EventBus::new(event_bus_capacity);
        let data = DataLayer::new(store.clone(), auth.clone());
        let session = SessionStore::new(data.users.clone(), auth.clone(), bus.clone());
        let notes = NotesStore::new(data.notes.clone(), images.clone(), bus.clone());

        info!(
            subsystem = "app",
            backend = %backend,
            image_uploads = images.is_some(),
            "SuperNotes context built"
        );

        Self {
            backend,
            bus,
            store,
            auth,
            images,
            data,
            session,
            notes,
        }
    }

    /// Spawn the notes listener, then the session listener, so the notes
    /// store sees the first identity event.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![self.notes.start(), self.session.start()]
    }
}
