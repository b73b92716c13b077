//! Connection settings for the hosted services.

use supernotes_core::defaults::{
    DEFAULT_CLOUDINARY_API_URL, DEFAULT_CLOUDINARY_FOLDER, DEFAULT_CLOUDINARY_UPLOAD_PRESET,
    DEFAULT_FIREBASE_AUTH_BASE_URL, DEFAULT_FIRESTORE_BASE_URL, DEFAULT_FIRESTORE_DATABASE,
    ENV_CLOUDINARY_CLOUD_NAME, ENV_CLOUDINARY_FOLDER, ENV_CLOUDINARY_UPLOAD_PRESET,
    ENV_CLOUDINARY_UPLOAD_URL, ENV_FIREBASE_API_KEY, ENV_FIREBASE_AUTH_BASE_URL,
    ENV_FIREBASE_PROJECT_ID, ENV_FIRESTORE_BASE_URL, ENV_FIRESTORE_DATABASE,
    ENV_REQUEST_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS,
};
use supernotes_core::{Error, Result};

/// Source of configuration values, keyed by environment variable name.
pub trait Lookup: Fn(&str) -> Option<String> {}

impl<F: Fn(&str) -> Option<String>> Lookup for F {}

/// Read from the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn value_or(lookup: &impl Lookup, name: &str, default: &str) -> String {
    lookup(name)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(lookup: &impl Lookup, name: &str) -> Result<String> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", name)))
}

/// Request timeout from `SUPERNOTES_REQUEST_TIMEOUT_SECS`.
pub fn timeout_from(lookup: &impl Lookup) -> u64 {
    lookup(ENV_REQUEST_TIMEOUT_SECS)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(REQUEST_TIMEOUT_SECS)
}

/// Firebase project settings shared by Firestore and the Identity Toolkit.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub database: String,
    /// Firestore REST root, without the `projects/...` path.
    pub firestore_base_url: String,
    /// Identity Toolkit REST root.
    pub auth_base_url: String,
    pub timeout_secs: u64,
}

impl FirebaseConfig {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            database: DEFAULT_FIRESTORE_DATABASE.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            auth_base_url: DEFAULT_FIREBASE_AUTH_BASE_URL.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// Point both services at one base URL (emulators, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.firestore_base_url = base.clone();
        self.auth_base_url = base;
        self
    }

    /// Read from the environment. The API key and project id are required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self> {
        Ok(Self {
            api_key: required(lookup, ENV_FIREBASE_API_KEY)?,
            project_id: required(lookup, ENV_FIREBASE_PROJECT_ID)?,
            database: value_or(lookup, ENV_FIRESTORE_DATABASE, DEFAULT_FIRESTORE_DATABASE),
            firestore_base_url: value_or(
                lookup,
                ENV_FIRESTORE_BASE_URL,
                DEFAULT_FIRESTORE_BASE_URL,
            ),
            auth_base_url: value_or(
                lookup,
                ENV_FIREBASE_AUTH_BASE_URL,
                DEFAULT_FIREBASE_AUTH_BASE_URL,
            ),
            timeout_secs: timeout_from(lookup),
        })
    }
}

/// Unsigned-upload settings for Cloudinary.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    /// Full upload endpoint, e.g. `https://api.cloudinary.com/v1_1/<cloud>/auto/upload`.
    pub upload_url: String,
    pub upload_preset: String,
    pub folder: String,
    pub timeout_secs: u64,
}

impl CloudinaryConfig {
    pub fn new(cloud_name: &str) -> Self {
        Self {
            upload_url: upload_url_for(cloud_name),
            upload_preset: DEFAULT_CLOUDINARY_UPLOAD_PRESET.to_string(),
            folder: DEFAULT_CLOUDINARY_FOLDER.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// Read from the environment. Either `CLOUDINARY_UPLOAD_URL` or
    /// `CLOUDINARY_CLOUD_NAME` must be set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self> {
        let upload_url = match lookup(ENV_CLOUDINARY_UPLOAD_URL) {
            Some(url) if !url.is_empty() => url,
            _ => upload_url_for(&required(lookup, ENV_CLOUDINARY_CLOUD_NAME)?),
        };
        Ok(Self {
            upload_url,
            upload_preset: value_or(
                lookup,
                ENV_CLOUDINARY_UPLOAD_PRESET,
                DEFAULT_CLOUDINARY_UPLOAD_PRESET,
            ),
            folder: value_or(lookup, ENV_CLOUDINARY_FOLDER, DEFAULT_CLOUDINARY_FOLDER),
            timeout_secs: timeout_from(lookup),
        })
    }
}

/// Upload endpoint for a cloud. `auto` lets the host detect the resource type.
pub fn upload_url_for(cloud_name: &str) -> String {
    format!("{}/{}/auto/upload", DEFAULT_CLOUDINARY_API_URL, cloud_name)
}
