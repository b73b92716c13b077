//! Profile data-access layer.
//!
//! Mirrors the identity issued by the [`AuthGateway`] into a `users` document
//! keyed by the identity id, and owns the account-deletion cascade.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use supernotes_core::defaults::{DEFAULT_FEDERATED_NAME, USERS_COLLECTION};
use supernotes_core::{
    AuthFailure, AuthGateway, AuthProvider, DocumentStore, Error, NoteRepository, Result, User,
    UserPatch, UserRepository,
};
use tracing::{error, info, instrument, warn};

use crate::codec::{profile_fields, user_from_document, user_patch_to_fields, user_to_fields};

const REGISTER_FAILED: &str = "Failed to create account. Please try again.";
const SIGN_IN_FAILED: &str = "Failed to sign in. Please check your credentials and try again.";
const FEDERATED_FAILED: &str = "Google Sign-In failed. Please try again.";
const SIGN_OUT_FAILED: &str = "Failed to sign out. Please try again.";
const PROFILE_FETCH_FAILED: &str = "Failed to fetch user profile. Please try again.";
const PROFILE_UPDATE_FAILED: &str = "Failed to update profile. Please try again.";
const DELETE_ACCOUNT_FAILED: &str = "Failed to delete account.";

fn failed(op: &'static str, message: &'static str, start: Instant, err: Error) -> Error {
    error!(
        subsystem = "db",
        component = "users",
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        error = %err,
        "User operation failed"
    );
    Error::failed(message, err)
}

/// Like [`failed`], but recognised auth failures pass through untouched so
/// the caller sees their specific message.
fn auth_failed(op: &'static str, message: &'static str, start: Instant, err: Error) -> Error {
    match err {
        Error::Auth(AuthFailure::Other(_)) => failed(op, message, start, err),
        Error::Auth(failure) => {
            error!(
                subsystem = "db",
                component = "users",
                op,
                duration_ms = start.elapsed().as_millis() as u64,
                error = %failure,
                "Authentication rejected"
            );
            Error::Auth(failure)
        }
        other => failed(op, message, start, other),
    }
}

/// [`UserRepository`] over an identity gateway and a document store.
#[derive(Clone)]
pub struct GatewayUserRepository {
    auth: Arc<dyn AuthGateway>,
    store: Arc<dyn DocumentStore>,
    notes: Arc<dyn NoteRepository>,
}

impl GatewayUserRepository {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        store: Arc<dyn DocumentStore>,
        notes: Arc<dyn NoteRepository>,
    ) -> Self {
        Self { auth, store, notes }
    }

    async fn read_profile(&self, user_id: &str) -> Result<Option<User>> {
        let doc = self.store.get(USERS_COLLECTION, user_id).await?;
        Ok(doc.as_ref().map(user_from_document))
    }

    /// End a session whose profile could not be loaded or written, so the
    /// gateway never holds an identity the caller was told failed.
    async fn abandon_sign_in(&self, op: &'static str) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(op, error = %e, "Sign-out after failed sign-in failed");
        }
    }

    /// Undo a sign-up whose profile was never written. The identity is
    /// deleted so the email can register again.
    async fn abandon_registration(&self) {
        if let Err(e) = self.auth.delete_current().await {
            warn!(error = %e, "Failed to delete identity of incomplete registration");
        }
        self.abandon_sign_in("register").await;
    }

    async fn create_profile(&self, user_id: &str, name: &str, email: &str) -> Result<()> {
        self.auth.update_display_name(name).await?;
        self.store
            .set(USERS_COLLECTION, user_id, profile_fields(name, email, None))
            .await
    }
}

#[async_trait]
impl UserRepository for GatewayUserRepository {
    #[instrument(skip(self, email, password, name), fields(subsystem = "db", component = "users", op = "register"))]
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let start = Instant::now();
        let identity = self
            .auth
            .sign_up(email, password)
            .await
            .map_err(|e| auth_failed("register", REGISTER_FAILED, start, e))?;

        let email = identity.email.clone().unwrap_or_else(|| email.to_string());
        if let Err(e) = self.create_profile(&identity.uid, name, &email).await {
            let err = auth_failed("register", REGISTER_FAILED, start, e);
            self.abandon_registration().await;
            return Err(err);
        }

        info!(
            user_id = %identity.uid,
            duration_ms = start.elapsed().as_millis() as u64,
            "Account registered"
        );
        Ok(User {
            id: identity.uid,
            name: name.to_string(),
            email,
            avatar: None,
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self, email, password), fields(subsystem = "db", component = "users", op = "sign_in"))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let start = Instant::now();
        let identity = self
            .auth
            .sign_in(email, password)
            .await
            .map_err(|e| auth_failed("sign_in", SIGN_IN_FAILED, start, e))?;

        let profile = match self.read_profile(&identity.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                let err = failed("sign_in", SIGN_IN_FAILED, start, e);
                self.abandon_sign_in("sign_in").await;
                return Err(err);
            }
        };

        let Some(user) = profile else {
            warn!(
                user_id = %identity.uid,
                "Signed-in identity has no profile, signing out"
            );
            self.abandon_sign_in("sign_in").await;
            return Err(Error::ProfileNotFound(identity.uid));
        };

        info!(
            user_id = %user.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Signed in"
        );
        Ok(user)
    }

    #[instrument(skip(self, id_token), fields(subsystem = "db", component = "users", op = "sign_in_federated"))]
    async fn sign_in_federated(&self, provider: AuthProvider, id_token: &str) -> Result<User> {
        let start = Instant::now();
        let signed_in = self
            .auth
            .sign_in_with_idp(provider, id_token)
            .await
            .map_err(|e| auth_failed("sign_in_federated", FEDERATED_FAILED, start, e))?;
        let identity = signed_in.identity;

        let existing = match self.read_profile(&identity.uid).await {
            Ok(existing) => existing,
            Err(e) => {
                let err = failed("sign_in_federated", FEDERATED_FAILED, start, e);
                self.abandon_sign_in("sign_in_federated").await;
                return Err(err);
            }
        };

        if let Some(user) = existing {
            info!(
                user_id = %user.id,
                is_new_user = false,
                duration_ms = start.elapsed().as_millis() as u64,
                "Federated sign-in"
            );
            return Ok(user);
        }

        let name = identity
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FEDERATED_NAME.to_string());
        let email = identity.email.clone().unwrap_or_default();
        let avatar = identity.photo_url.clone();

        if let Err(e) = self
            .store
            .set(
                USERS_COLLECTION,
                &identity.uid,
                profile_fields(&name, &email, avatar.as_deref()),
            )
            .await
        {
            let err = failed("sign_in_federated", FEDERATED_FAILED, start, e);
            self.abandon_sign_in("sign_in_federated").await;
            return Err(err);
        }

        info!(
            user_id = %identity.uid,
            is_new_user = true,
            duration_ms = start.elapsed().as_millis() as u64,
            "Federated sign-in"
        );
        Ok(User {
            id: identity.uid,
            name,
            email,
            avatar,
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "users", op = "sign_out"))]
    async fn sign_out(&self) -> Result<()> {
        let start = Instant::now();
        self.auth
            .sign_out()
            .await
            .map_err(|e| failed("sign_out", SIGN_OUT_FAILED, start, e))?;
        info!("Signed out");
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "users", op = "get_profile"))]
    async fn get_profile(&self, user_id: &str) -> Result<Option<User>> {
        let start = Instant::now();
        self.read_profile(user_id)
            .await
            .map_err(|e| failed("get_profile", PROFILE_FETCH_FAILED, start, e))
    }

    #[instrument(skip(self, patch), fields(subsystem = "db", component = "users", op = "update_profile"))]
    async fn update_profile(&self, user_id: &str, patch: &UserPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        self.store
            .update(USERS_COLLECTION, user_id, user_patch_to_fields(patch))
            .await
            .map_err(|e| failed("update_profile", PROFILE_UPDATE_FAILED, start, e))?;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Profile updated"
        );
        Ok(())
    }

    /// Notes first, then the profile, then the identity. The identity goes
    /// last because the database only accepts the data deletes while it is
    /// still valid. If the identity delete fails the profile is written back
    /// so the account can still sign in; deleted notes stay deleted.
    #[instrument(skip(self), fields(subsystem = "db", component = "users", op = "delete_account"))]
    async fn delete_account(&self, user_id: &str) -> Result<()> {
        let start = Instant::now();
        match self.auth.current() {
            None => return Err(Error::Unauthorized("No user logged in".to_string())),
            Some(identity) if identity.uid != user_id => {
                return Err(Error::Forbidden(format!(
                    "cannot delete account {} while signed in as another user",
                    user_id
                )))
            }
            Some(_) => {}
        }

        // Read up front so a failed identity delete can restore it.
        let profile = self
            .read_profile(user_id)
            .await
            .map_err(|e| failed("delete_account", DELETE_ACCOUNT_FAILED, start, e))?;

        let removed = self
            .notes
            .delete_all_for_user(user_id)
            .await
            .map_err(|e| failed("delete_account", DELETE_ACCOUNT_FAILED, start, e))?;

        match self.store.delete(USERS_COLLECTION, user_id).await {
            Ok(()) | Err(Error::NotFound(_)) => {}
            Err(e) => return Err(failed("delete_account", DELETE_ACCOUNT_FAILED, start, e)),
        }

        if let Err(e) = self.auth.delete_current().await {
            let err = auth_failed("delete_account", DELETE_ACCOUNT_FAILED, start, e);
            if let Some(user) = &profile {
                match self
                    .store
                    .set(USERS_COLLECTION, user_id, user_to_fields(user))
                    .await
                {
                    Ok(()) => warn!(user_id, "Identity delete failed, profile restored"),
                    Err(restore) => {
                        error!(user_id, error = %restore, "Failed to restore profile")
                    }
                }
            }
            return Err(err);
        }

        info!(
            notes_removed = removed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Account deleted"
        );
        Ok(())
    }
}
