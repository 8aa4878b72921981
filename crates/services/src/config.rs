use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::BackendError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DB_URL: &str = "sqlite://drive.sqlite3";

/// Where the REST backend lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: Url,
    timeout: Duration,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let mut url =
            Url::parse(base_url.trim()).map_err(|err| BackendError::InvalidUrl(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        // Url::join replaces the last segment unless the path ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads `DRIVE_API_BASE_URL` and `DRIVE_HTTP_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the configured URL is invalid.
    pub fn from_env() -> Result<Self, BackendError> {
        let base_url = env::var("DRIVE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout = env::var("DRIVE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self::new(&base_url)?.with_timeout(Duration::from_secs(timeout)))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a path relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| BackendError::InvalidUrl(err.to_string()))
    }
}

/// Everything the app needs to wire its services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub backend: BackendConfig,
    /// Authored scenario descriptors; backend records are used when absent.
    pub content_path: Option<PathBuf>,
    /// Curriculum override; the built-in road-safety curriculum when absent.
    pub curriculum_path: Option<PathBuf>,
}

impl AppConfig {
    /// Reads `DRIVE_DB_URL`, `DRIVE_CONTENT`, `DRIVE_CURRICULUM` and the backend settings.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the configured backend URL is invalid.
    pub fn from_env() -> Result<Self, BackendError> {
        Ok(Self {
            db_url: non_empty_var("DRIVE_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            backend: BackendConfig::from_env()?,
            content_path: non_empty_var("DRIVE_CONTENT").map(PathBuf::from),
            curriculum_path: non_empty_var("DRIVE_CURRICULUM").map(PathBuf::from),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
