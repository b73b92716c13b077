//! Application configuration.
//!
//! Everything is read from environment variables (a `.env` file is loaded
//! first when present). `SUPERNOTES_BACKEND` picks the hosted Firebase stack
//! or the in-process memory stack; image uploads are enabled only when
//! Cloudinary is configured.

use std::fmt;
use std::str::FromStr;

use supernotes_core::defaults::{
    ENV_BACKEND, ENV_CLOUDINARY_CLOUD_NAME, ENV_CLOUDINARY_UPLOAD_URL, ENV_EVENT_BUS_CAPACITY,
    EVENT_BUS_CAPACITY,
};
use supernotes_gateway::config::{env_lookup, Lookup};
use supernotes_gateway::{CloudinaryConfig, FirebaseConfig};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend: {0}. Must be 'firebase' or 'memory'")]
    InvalidBackend(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Service configuration error: {0}")]
    Service(#[from] supernotes_core::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which stack backs persistence and identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Firestore + Firebase Auth over REST.
    #[default]
    Firebase,
    /// In-process store and identity gateway. Nothing survives the process.
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firebase => write!(f, "firebase"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    /// Present for [`Backend::Firebase`].
    pub firebase: Option<FirebaseConfig>,
    /// Image uploads are disabled when absent.
    pub cloudinary: Option<CloudinaryConfig>,
    pub event_bus_capacity: usize,
}

impl AppConfig {
    /// Everything in process, no uploads.
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory,
            firebase: None,
            cloudinary: None,
            event_bus_capacity: EVENT_BUS_CAPACITY,
        }
    }

    pub fn firebase(firebase: FirebaseConfig) -> Self {
        Self {
            backend: Backend::Firebase,
            firebase: Some(firebase),
            cloudinary: None,
            event_bus_capacity: EVENT_BUS_CAPACITY,
        }
    }

    pub fn with_cloudinary(mut self, cloudinary: CloudinaryConfig) -> Self {
        self.cloudinary = Some(cloudinary);
        self
    }

    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> ConfigResult<Self> {
        let backend = match lookup(ENV_BACKEND).filter(|v| !v.is_empty()) {
            Some(value) => value.parse()?,
            None => Backend::default(),
        };

        let firebase = match backend {
            Backend::Firebase => Some(FirebaseConfig::from_lookup(lookup)?),
            Backend::Memory => None,
        };

        let uploads_configured = [ENV_CLOUDINARY_CLOUD_NAME, ENV_CLOUDINARY_UPLOAD_URL]
            .iter()
            .any(|name| lookup(name).is_some_and(|v| !v.is_empty()));
        let cloudinary = if uploads_configured {
            Some(CloudinaryConfig::from_lookup(lookup)?)
        } else {
            None
        };

        let event_bus_capacity = match lookup(ENV_EVENT_BUS_CAPACITY).filter(|v| !v.is_empty()) {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_EVENT_BUS_CAPACITY,
                        value,
                    })
                }
            },
            None => EVENT_BUS_CAPACITY,
        };

        Ok(Self {
            backend,
            firebase,
            cloudinary,
            event_bus_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("firebase".parse::<Backend>().unwrap(), Backend::Firebase);
        assert_eq!("MEMORY".parse::<Backend>().unwrap(), Backend::Memory);
        assert!(matches!(
            "sqlite".parse::<Backend>(),
            Err(ConfigError::InvalidBackend(_))
        ));
    }

    #[test]
    fn test_backend_default_is_firebase() {
        assert_eq!(Backend::default(), Backend::Firebase);
        assert_eq!(Backend::Firebase.to_string(), "firebase");
    }

    #[test]
    fn test_firebase_backend_requires_credentials() {
        let err = AppConfig::from_lookup(&lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Service(supernotes_core::Error::Config(_))));
    }

    #[test]
    fn test_memory_backend_needs_nothing() {
        let config = AppConfig::from_lookup(&lookup(&[("SUPERNOTES_BACKEND", "memory")])).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.firebase.is_none());
        assert!(config.cloudinary.is_none());
        assert_eq!(config.event_bus_capacity, EVENT_BUS_CAPACITY);
    }

    #[test]
    fn test_cloudinary_enabled_by_cloud_name() {
        let config = AppConfig::from_lookup(&lookup(&[
            ("SUPERNOTES_BACKEND", "memory"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
        ]))
        .unwrap();
        let cloudinary = config.cloudinary.unwrap();
        assert!(cloudinary.upload_url.ends_with("/demo/auto/upload"));
    }

    #[test]
    fn test_firebase_backend_reads_project() {
        let config = AppConfig::from_lookup(&lookup(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "supernotes-dev"),
            ("SUPERNOTES_EVENT_BUS_CAPACITY", "8"),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::Firebase);
        assert_eq!(config.firebase.unwrap().project_id, "supernotes-dev");
        assert_eq!(config.event_bus_capacity, 8);
    }

    #[test]
    fn test_invalid_bus_capacity() {
        let err = AppConfig::from_lookup(&lookup(&[
            ("SUPERNOTES_BACKEND", "memory"),
            ("SUPERNOTES_EVENT_BUS_CAPACITY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "SUPERNOTES_EVENT_BUS_CAPACITY", .. }
        ));
    }
}
