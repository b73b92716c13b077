//! Session store: who is signed in, and their profile.
//!
//! The store is a projection of the identity gateway. A listener task follows
//! the gateway's `watch` channel, republishes identity changes on the
//! [`EventBus`], and loads the matching profile. The sign-in operations drive
//! the `SignedOut -> Authenticating -> SignedIn | SignedOut` transitions
//! directly so callers see the outcome as soon as the call returns.

use std::sync::Arc;
use std::time::Instant;

use supernotes_core::{
    validate_credentials, validate_user_patch, AuthGateway, AuthIdentity, AuthProvider, Error,
    EventBus, Result, SessionEvent, User, UserPatch, UserRepository,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    SignedOut,
    Authenticating,
    SignedIn,
}

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<User>,
    /// True until the first identity notification is applied, and while a
    /// sign-in attempt is in flight.
    pub loading: bool,
    /// Message from the last failed operation.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::SignedOut,
            user: None,
            loading: true,
            error: None,
        }
    }
}

struct Inner {
    state: RwLock<SessionState>,
    users: Arc<dyn UserRepository>,
    auth: Arc<dyn AuthGateway>,
    bus: EventBus,
}

/// Process-wide session container. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(users: Arc<dyn UserRepository>, auth: Arc<dyn AuthGateway>, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(SessionState::default()),
                users,
                auth,
                bus,
            }),
        }
    }

    /// Spawn the identity listener. The current identity is applied
    /// immediately, then every change after it.
    pub fn start(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut rx = self.inner.auth.subscribe();
        tokio::spawn(async move {
            let mut last_uid = None;
            loop {
                let identity = rx.borrow_and_update().clone();
                store.apply_identity(identity, &mut last_uid).await;
                if rx.changed().await.is_err() {
                    debug!("Identity channel closed, session listener stopping");
                    break;
                }
            }
        })
    }

    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.state.read().await.status
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.state.read().await.user.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.state.write().await.error = None;
    }

    async fn apply_identity(&self, identity: Option<AuthIdentity>, last_uid: &mut Option<String>) {
        let uid = identity.as_ref().map(|i| i.uid.clone());
        if uid != *last_uid {
            info!(
                subsystem = "session",
                user_id = uid.as_deref().unwrap_or_default(),
                "Identity changed"
            );
            self.inner.bus.emit(SessionEvent::IdentityChanged {
                user_id: uid.clone(),
            });
            *last_uid = uid;
        }

        let Some(identity) = identity else {
            let mut state = self.inner.state.write().await;
            if state.status != SessionStatus::Authenticating {
                state.status = SessionStatus::SignedOut;
                state.loading = false;
            }
            state.user = None;
            return;
        };

        let profile = self.inner.users.get_profile(&identity.uid).await;

        // A newer notification may have landed while the profile loaded.
        if self.inner.auth.current().map(|i| i.uid) != Some(identity.uid.clone()) {
            return;
        }

        let mut state = self.inner.state.write().await;
        match profile {
            Ok(Some(user)) => {
                state.status = SessionStatus::SignedIn;
                state.user = Some(user);
                state.loading = false;
            }
            // Registration writes the profile after the identity exists.
            Ok(None) => debug!(user_id = %identity.uid, "Identity has no profile yet"),
            Err(e) => {
                warn!(user_id = %identity.uid, error = %e, "Failed to load profile");
                if state.status != SessionStatus::Authenticating {
                    state.loading = false;
                }
            }
        }
    }

    async fn begin_attempt(&self) {
        let mut state = self.inner.state.write().await;
        state.status = SessionStatus::Authenticating;
        state.loading = true;
        state.error = None;
    }

    async fn finish_attempt(
        &self,
        op: &'static str,
        start: Instant,
        result: Result<User>,
    ) -> Result<User> {
        let mut state = self.inner.state.write().await;
        state.loading = false;
        match result {
            Ok(user) => {
                info!(
                    subsystem = "session",
                    op,
                    user_id = %user.id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Session signed in"
                );
                state.status = SessionStatus::SignedIn;
                state.user = Some(user.clone());
                state.error = None;
                Ok(user)
            }
            Err(e) => {
                warn!(
                    subsystem = "session",
                    op,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Sign-in attempt failed"
                );
                state.status = SessionStatus::SignedOut;
                state.user = None;
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn reject(&self, err: Error) -> Error {
        self.inner.state.write().await.error = Some(err.user_message());
        err
    }

    /// Signed-in identity id, straight from the gateway.
    fn require_uid(&self) -> Result<String> {
        self.inner
            .auth
            .current()
            .map(|i| i.uid)
            .ok_or_else(|| Error::Unauthorized("No user logged in".to_string()))
    }

    #[instrument(skip_all, fields(subsystem = "session", op = "sign_in"))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        if let Err(e) = validate_credentials(email, password, None) {
            return Err(self.reject(e).await);
        }
        let start = Instant::now();
        self.begin_attempt().await;
        let result = self.inner.users.sign_in(email.trim(), password).await;
        self.finish_attempt("sign_in", start, result).await
    }

    #[instrument(skip_all, fields(subsystem = "session", op = "register"))]
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User> {
        if let Err(e) = validate_credentials(email, password, Some(name)) {
            return Err(self.reject(e).await);
        }
        let start = Instant::now();
        self.begin_attempt().await;
        let result = self
            .inner
            .users
            .register(email.trim(), password, name.trim())
            .await;
        self.finish_attempt("register", start, result).await
    }

    #[instrument(skip_all, fields(subsystem = "session", op = "sign_in_federated"))]
    pub async fn sign_in_federated(&self, provider: AuthProvider, id_token: &str) -> Result<User> {
        let start = Instant::now();
        self.begin_attempt().await;
        let result = self.inner.users.sign_in_federated(provider, id_token).await;
        self.finish_attempt("sign_in_federated", start, result).await
    }

    #[instrument(skip_all, fields(subsystem = "session", op = "sign_out"))]
    pub async fn sign_out(&self) -> Result<()> {
        if let Err(e) = self.inner.users.sign_out().await {
            return Err(self.reject(e).await);
        }
        let mut state = self.inner.state.write().await;
        state.status = SessionStatus::SignedOut;
        state.user = None;
        state.error = None;
        state.loading = false;
        Ok(())
    }

    /// Save a profile edit and merge it into the cached profile.
    #[instrument(skip_all, fields(subsystem = "session", op = "update_profile"))]
    pub async fn update_profile(&self, patch: UserPatch) -> Result<()> {
        let uid = self.require_uid()?;
        if let Err(e) = validate_user_patch(&patch) {
            return Err(self.reject(e).await);
        }
        if let Err(e) = self.inner.users.update_profile(&uid, &patch).await {
            return Err(self.reject(e).await);
        }
        {
            let mut state = self.inner.state.write().await;
            if let Some(user) = state.user.as_mut() {
                patch.apply_to(user);
            }
            state.error = None;
        }
        self.inner
            .bus
            .emit(SessionEvent::ProfileUpdated { user_id: uid });
        Ok(())
    }

    /// Delete the account and everything it owns, then end the session.
    #[instrument(skip_all, fields(subsystem = "session", op = "delete_account"))]
    pub async fn delete_account(&self) -> Result<()> {
        let uid = self.require_uid()?;
        if let Err(e) = self.inner.users.delete_account(&uid).await {
            return Err(self.reject(e).await);
        }
        {
            let mut state = self.inner.state.write().await;
            state.status = SessionStatus::SignedOut;
            state.user = None;
            state.error = None;
            state.loading = false;
        }
        self.inner
            .bus
            .emit(SessionEvent::AccountDeleted { user_id: uid });
        Ok(())
    }

    /// Reload the cached profile from storage.
    pub async fn refresh_profile(&self) -> Result<Option<User>> {
        let uid = self.require_uid()?;
        let profile = match self.inner.users.get_profile(&uid).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.reject(e).await),
        };
        let mut state = self.inner.state.write().await;
        if let Some(user) = &profile {
            state.user = Some(user.clone());
            state.status = SessionStatus::SignedIn;
        }
        Ok(profile)
    }
}
