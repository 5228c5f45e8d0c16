use std::path::PathBuf;
use thiserror::Error;

use crate::infrastructure::scm::scm_interface::ScmError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("The secure store '{name}' is locked: cannot proceed without an unlocked secure store")]
    StoreLocked { name: String },

    #[error("Secure store operation failed: {message}")]
    StoreError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid argument: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    #[error("No secret found for {what}")]
    NotFound { what: String },

    #[error("Authentication check failed for remote '{remote}': {message}")]
    AuthProbeFailure {
        remote: String,
        message: String,
        #[source]
        source: Option<ScmError>,
    },

    #[error("Invalid credentials given for user '{username}' on {url}")]
    InvalidCredentials { username: String, url: String },

    #[error("Update failed for '{}' from remote '{remote}': {message}", path.display())]
    UpdateFailure {
        path: PathBuf,
        remote: String,
        message: String,
        #[source]
        source: Option<ScmError>,
    },

    #[error("Bad invocation -- environment wasn't set up: missing {variable}")]
    BadRelayInvocation { variable: String },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File system operation failed: {message}")]
    FileSystemError {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("SCM operation failed: {0}")]
    Scm(#[from] ScmError),
}

impl SyncError {
    pub fn store_locked(name: impl Into<String>) -> Self {
        Self::StoreLocked { name: name.into() }
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
            source: None,
        }
    }

    pub fn store_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn auth_probe_failure(remote: impl Into<String>, source: ScmError) -> Self {
        Self::AuthProbeFailure {
            remote: remote.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn invalid_credentials(username: impl Into<String>, url: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            username: username.into(),
            url: url.into(),
        }
    }

    pub fn update_failure(path: impl Into<PathBuf>, remote: impl Into<String>, source: ScmError) -> Self {
        Self::UpdateFailure {
            path: path.into(),
            remote: remote.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn bad_relay_invocation(variable: impl Into<String>) -> Self {
        Self::BadRelayInvocation {
            variable: variable.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    /// Whether this error must abort the whole run instead of a single remote.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StoreLocked { .. } | Self::BadRelayInvocation { .. } | Self::ConfigError { .. }
        )
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        Self::store_error_with_source("Secure store index is corrupt", error)
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(error: validator::ValidationErrors) -> Self {
        Self::config_error_with_source("Invalid run configuration", error)
    }
}
