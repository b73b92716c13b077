//! In-process identity gateway for tests and offline use.
//!
//! Enforces the same rules the hosted gateway does (unique email, six
//! character passwords, one provider per email) and reports the same
//! [`AuthFailure`] codes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use supernotes_core::{
    AuthFailure, AuthGateway, AuthIdentity, AuthProvider, Error, FederatedSignIn, Result,
    TokenProvider,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    provider: AuthProvider,
}

impl Account {
    fn identity(&self) -> AuthIdentity {
        AuthIdentity {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            provider: self.provider,
            id_token: String::new(),
            refresh_token: None,
        }
    }
}

/// Profile a federated token resolves to.
#[derive(Debug, Clone)]
struct FederatedProfile {
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Default)]
struct Accounts {
    /// Keyed by lowercased email.
    by_email: HashMap<String, Account>,
    federated_tokens: HashMap<String, FederatedProfile>,
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn new_uid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// [`AuthGateway`] holding accounts in memory.
pub struct MemoryAuthGateway {
    accounts: Mutex<Accounts>,
    state: watch::Sender<Option<AuthIdentity>>,
    offline: AtomicBool,
}

impl Default for MemoryAuthGateway {
    fn default() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(Accounts::default()),
            state,
            offline: AtomicBool::new(false),
        }
    }
}

impl MemoryAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id_token` a valid federated credential for the given profile.
    pub async fn register_federated_token(
        &self,
        id_token: &str,
        email: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) {
        self.accounts.lock().await.federated_tokens.insert(
            id_token.to_string(),
            FederatedProfile {
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
                photo_url: photo_url.map(str::to_string),
            },
        );
    }

    /// While offline every call fails with `NetworkRequestFailed`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.lock().await.by_email.len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Auth(AuthFailure::NetworkRequestFailed));
        }
        Ok(())
    }

    fn publish(&self, identity: Option<AuthIdentity>) {
        self.state.send_replace(identity);
    }
}

impl TokenProvider for MemoryAuthGateway {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

#[async_trait]
impl AuthGateway for MemoryAuthGateway {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity> {
        self.check_online()?;
        if !looks_like_email(email) {
            return Err(AuthFailure::InvalidEmail.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthFailure::WeakPassword.into());
        }
        let key = email.to_lowercase();
        let mut accounts = self.accounts.lock().await;
        if accounts.by_email.contains_key(&key) {
            return Err(AuthFailure::EmailAlreadyInUse.into());
        }
        let account = Account {
            uid: new_uid(),
            email: email.to_string(),
            password: Some(password.to_string()),
            display_name: None,
            photo_url: None,
            provider: AuthProvider::Password,
        };
        let identity = account.identity();
        accounts.by_email.insert(key, account);
        drop(accounts);

        info!(user_id = %identity.uid, "Memory identity created");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity> {
        self.check_online()?;
        if !looks_like_email(email) {
            return Err(AuthFailure::InvalidEmail.into());
        }
        let identity = {
            let accounts = self.accounts.lock().await;
            let account = accounts
                .by_email
                .get(&email.to_lowercase())
                .ok_or(AuthFailure::UserNotFound)?;
            if account.password.as_deref() != Some(password) {
                return Err(AuthFailure::WrongPassword.into());
            }
            account.identity()
        };
        debug!(user_id = %identity.uid, "Memory identity signed in");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_idp(
        &self,
        provider: AuthProvider,
        id_token: &str,
    ) -> Result<FederatedSignIn> {
        self.check_online()?;
        let mut accounts = self.accounts.lock().await;
        let profile = accounts
            .federated_tokens
            .get(id_token)
            .cloned()
            .ok_or(AuthFailure::InvalidFederatedCredential)?;
        let key = profile.email.to_lowercase();

        let (identity, is_new_user) = match accounts.by_email.get(&key) {
            Some(existing) if existing.provider != provider => {
                return Err(AuthFailure::AccountExistsWithDifferentCredential.into());
            }
            Some(existing) => (existing.identity(), false),
            None => {
                let account = Account {
                    uid: new_uid(),
                    email: profile.email,
                    password: None,
                    display_name: profile.display_name,
                    photo_url: profile.photo_url,
                    provider,
                };
                let identity = account.identity();
                accounts.by_email.insert(key, account);
                (identity, true)
            }
        };
        drop(accounts);

        self.publish(Some(identity.clone()));
        Ok(FederatedSignIn {
            identity,
            is_new_user,
        })
    }

    async fn update_display_name(&self, name: &str) -> Result<()> {
        self.check_online()?;
        let Some(mut identity) = self.current() else {
            return Err(Error::Unauthorized("No user logged in".to_string()));
        };
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.by_email.values_mut().find(|a| a.uid == identity.uid) {
            account.display_name = Some(name.to_string());
        }
        drop(accounts);
        identity.display_name = Some(name.to_string());
        self.publish(Some(identity));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.publish(None);
        Ok(())
    }

    async fn delete_current(&self) -> Result<()> {
        self.check_online()?;
        let Some(identity) = self.current() else {
            return Err(Error::Unauthorized("No user logged in".to_string()));
        };
        self.accounts
            .lock()
            .await
            .by_email
            .retain(|_, account| account.uid != identity.uid);
        info!(user_id = %identity.uid, "Memory identity deleted");
        self.publish(None);
        Ok(())
    }

    fn current(&self) -> Option<AuthIdentity> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthIdentity>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = MemoryAuthGateway::new();
        let created = auth.sign_up("Ana@Example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current().is_none());

        let signed_in = auth.sign_in("ana@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert_eq!(auth.current().map(|i| i.uid), Some(created.uid));
    }

    #[tokio::test]
    async fn test_sign_up_failures() {
        let auth = MemoryAuthGateway::new();
        let err = auth.sign_up("not-an-email", "secret1").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::InvalidEmail)));
        let err = auth.sign_up("a@b.co", "12345").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::WeakPassword)));

        auth.sign_up("a@b.co", "123456").await.unwrap();
        let err = auth.sign_up("A@B.CO", "123456").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::EmailAlreadyInUse)));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let auth = MemoryAuthGateway::new();
        auth.sign_up("a@b.co", "123456").await.unwrap();
        let err = auth.sign_in("x@b.co", "123456").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::UserNotFound)));
        let err = auth.sign_in("a@b.co", "654321").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::WrongPassword)));
    }

    #[tokio::test]
    async fn test_federated_first_and_repeat_sign_in() {
        let auth = MemoryAuthGateway::new();
        auth.register_federated_token("tok", "g@x.io", Some("Gee"), None)
            .await;

        let first = auth
            .sign_in_with_idp(AuthProvider::Google, "tok")
            .await
            .unwrap();
        assert!(first.is_new_user);
        assert_eq!(first.identity.display_name.as_deref(), Some("Gee"));

        let again = auth
            .sign_in_with_idp(AuthProvider::Google, "tok")
            .await
            .unwrap();
        assert!(!again.is_new_user);
        assert_eq!(again.identity.uid, first.identity.uid);

        let err = auth
            .sign_in_with_idp(AuthProvider::Google, "bogus")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthFailure::InvalidFederatedCredential)
        ));
    }

    #[tokio::test]
    async fn test_federated_email_clash_with_password_account() {
        let auth = MemoryAuthGateway::new();
        auth.sign_up("g@x.io", "123456").await.unwrap();
        auth.register_federated_token("tok", "g@x.io", None, None).await;
        let err = auth
            .sign_in_with_idp(AuthProvider::Google, "tok")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthFailure::AccountExistsWithDifferentCredential)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let auth = MemoryAuthGateway::new();
        let mut rx = auth.subscribe();
        auth.sign_up("a@b.co", "123456").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());

        auth.delete_current().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert_eq!(auth.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_offline_reports_network_failure() {
        let auth = MemoryAuthGateway::new();
        auth.set_offline(true);
        let err = auth.sign_in("a@b.co", "123456").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthFailure::NetworkRequestFailed)));
    }
}
