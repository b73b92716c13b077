//! Firebase Authentication over the Identity Toolkit REST API.
//!
//! The signed-in identity lives in a `watch` channel: `current()` reads it,
//! `subscribe()` observes changes, and the ID token doubles as the bearer
//! token for [`FirestoreStore`](crate::FirestoreStore).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use supernotes_core::{
    AuthFailure, AuthGateway, AuthIdentity, AuthProvider, Error, FederatedSignIn, Result,
    TokenProvider,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::FirebaseConfig;
use crate::error::GoogleError;

/// Redirect URI the Identity Toolkit requires for `signInWithIdp`. Unused
/// when the credential is posted directly.
const IDP_REQUEST_URI: &str = "http://localhost";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    id_token: &'a str,
}

/// Union of the fields the account endpoints return.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(default)]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    is_new_user: bool,
    #[serde(default)]
    need_confirmation: bool,
}

impl AccountResponse {
    fn into_identity(self, provider: AuthProvider) -> AuthIdentity {
        AuthIdentity {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name.filter(|n| !n.is_empty()),
            photo_url: self.photo_url,
            provider,
            id_token: self.id_token.unwrap_or_default(),
            refresh_token: self.refresh_token,
        }
    }
}

/// Map an Identity Toolkit error code onto [`AuthFailure`].
///
/// Messages look like `"WEAK_PASSWORD : Password should be at least 6
/// characters"`; only the code before `" :"` matters.
pub fn map_auth_error(message: &str) -> AuthFailure {
    let code = message.split(" :").next().unwrap_or_default().trim();
    match code {
        "EMAIL_EXISTS" => AuthFailure::EmailAlreadyInUse,
        "WEAK_PASSWORD" => AuthFailure::WeakPassword,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthFailure::InvalidEmail,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthFailure::UserNotFound,
        "INVALID_PASSWORD" | "MISSING_PASSWORD" => AuthFailure::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" => AuthFailure::InvalidCredentials,
        "INVALID_IDP_RESPONSE" | "INVALID_CREDENTIAL_OR_PROVIDER_ID" => {
            AuthFailure::InvalidFederatedCredential
        }
        "FEDERATED_USER_ID_ALREADY_LINKED" => AuthFailure::AccountExistsWithDifferentCredential,
        "USER_DISABLED" => AuthFailure::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthFailure::TooManyAttempts,
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => AuthFailure::RequiresRecentLogin,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_TOKEN_EXPIRED" => AuthFailure::SessionExpired,
        other => AuthFailure::Other(other.to_string()),
    }
}

/// [`AuthGateway`] backed by Firebase Authentication.
pub struct FirebaseAuth {
    client: Client,
    config: FirebaseConfig,
    state: watch::Sender<Option<AuthIdentity>>,
}

impl FirebaseAuth {
    pub fn new(config: FirebaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        let (state, _) = watch::channel(None);
        Ok(Self {
            client,
            config,
            state,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}",
            self.config.auth_base_url.trim_end_matches('/'),
            method
        )
    }

    // TODO: exchange the refresh token at securetoken.googleapis.com once the
    // hour-long ID token expires instead of surfacing SessionExpired.
    async fn call<B: Serialize + ?Sized>(
        &self,
        method: &'static str,
        body: &B,
    ) -> Result<AccountResponse> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(method, error = %e, "Identity Toolkit unreachable");
                Error::Auth(AuthFailure::NetworkRequestFailed)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = map_auth_error(&GoogleError::from_body(status, &body).message);
            warn!(
                method,
                http_status = status.as_u16(),
                error = %failure,
                duration_ms = start.elapsed().as_millis() as u64,
                "Identity Toolkit rejected request"
            );
            return Err(Error::Auth(failure));
        }

        let account = response.json::<AccountResponse>().await?;
        debug!(
            method,
            duration_ms = start.elapsed().as_millis() as u64,
            "Identity Toolkit call complete"
        );
        Ok(account)
    }

    fn require_current(&self) -> Result<AuthIdentity> {
        self.current()
            .ok_or_else(|| Error::Unauthorized("No user logged in".to_string()))
    }
}

impl TokenProvider for FirebaseAuth {
    fn bearer_token(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .map(|identity| identity.id_token.clone())
            .filter(|token| !token.is_empty())
    }
}

#[async_trait]
impl AuthGateway for FirebaseAuth {
    #[instrument(skip(self, email, password), fields(subsystem = "gateway", component = "firebase_auth", op = "sign_up"))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthIdentity> {
        let account = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let identity = account.into_identity(AuthProvider::Password);
        info!(user_id = %identity.uid, "Identity created");
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self, email, password), fields(subsystem = "gateway", component = "firebase_auth", op = "sign_in"))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthIdentity> {
        let account = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        let identity = account.into_identity(AuthProvider::Password);
        info!(user_id = %identity.uid, "Identity signed in");
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self, id_token), fields(subsystem = "gateway", component = "firebase_auth", op = "sign_in_with_idp"))]
    async fn sign_in_with_idp(
        &self,
        provider: AuthProvider,
        id_token: &str,
    ) -> Result<FederatedSignIn> {
        let account = self
            .call(
                "signInWithIdp",
                &IdpRequest {
                    post_body: format!(
                        "id_token={}&providerId={}",
                        id_token,
                        provider.provider_id()
                    ),
                    request_uri: IDP_REQUEST_URI,
                    return_idp_credential: true,
                    return_secure_token: true,
                },
            )
            .await?;
        // Same email already registered with another provider.
        if account.need_confirmation {
            return Err(Error::Auth(AuthFailure::AccountExistsWithDifferentCredential));
        }
        let is_new_user = account.is_new_user;
        let identity = account.into_identity(provider);
        info!(user_id = %identity.uid, is_new_user, "Federated identity signed in");
        self.state.send_replace(Some(identity.clone()));
        Ok(FederatedSignIn {
            identity,
            is_new_user,
        })
    }

    #[instrument(skip(self, name), fields(subsystem = "gateway", component = "firebase_auth", op = "update_display_name"))]
    async fn update_display_name(&self, name: &str) -> Result<()> {
        let mut identity = self.require_current()?;
        let account = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: &identity.id_token,
                    display_name: name,
                    return_secure_token: true,
                },
            )
            .await?;
        identity.display_name = Some(name.to_string());
        if let Some(token) = account.id_token {
            identity.id_token = token;
        }
        if account.refresh_token.is_some() {
            identity.refresh_token = account.refresh_token;
        }
        self.state.send_replace(Some(identity));
        Ok(())
    }

    /// Local only: the Identity Toolkit keeps no server-side session.
    async fn sign_out(&self) -> Result<()> {
        if let Some(previous) = self.state.send_replace(None) {
            info!(user_id = %previous.uid, "Identity signed out");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "firebase_auth", op = "delete_current"))]
    async fn delete_current(&self) -> Result<()> {
        let identity = self.require_current()?;
        self.call(
            "delete",
            &DeleteRequest {
                id_token: &identity.id_token,
            },
        )
        .await?;
        info!(user_id = %identity.uid, "Identity deleted");
        self.state.send_replace(None);
        Ok(())
    }

    fn current(&self) -> Option<AuthIdentity> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthIdentity>> {
        self.state.subscribe()
    }
}
