use crate::domain::entities::{Remote, Repository};
use crate::domain::value_objects::{Credential, Identity, ScmType};
use crate::infrastructure::keyring::SecretStorage;
use crate::infrastructure::process::CommandOutput;
use async_trait::async_trait;
use std::path::Path;

/// Common interface for all SCM operations
#[async_trait]
pub trait ScmOperations: Send + Sync {
    /// Get the SCM type this implementation handles
    fn scm_type(&self) -> ScmType;

    /// Check if a directory is a working copy for this SCM
    fn is_repository(&self, path: &Path) -> bool;

    /// Read the working copy at `path` with its remotes
    async fn open_repository(&self, path: &Path) -> Result<Repository, ScmError>;

    /// Run the read-only authentication probe against `remote`
    async fn probe(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError>;

    /// Fetch or update from `remote`
    async fn update(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError>;
}

/// Which credential a command should present, if any.
#[derive(Debug, Clone, Copy)]
pub enum CredentialUse<'a> {
    /// Run without a credential.
    Anonymous,
    /// A credential already kept in the store under the remote's identity.
    Stored(&'a Credential),
    /// A credential typed by the user that is not stored yet.
    Candidate(&'a Credential),
}

impl<'a> CredentialUse<'a> {
    pub fn credential(&self) -> Option<&'a Credential> {
        match self {
            CredentialUse::Anonymous => None,
            CredentialUse::Stored(credential) | CredentialUse::Candidate(credential) => {
                Some(credential)
            }
        }
    }
}

/// Authentication context of a single probe or update.
#[derive(Clone, Copy)]
pub struct RemoteAuth<'a> {
    pub storage: &'a SecretStorage,
    pub identity: &'a Identity,
    pub credential: CredentialUse<'a>,
}

impl<'a> RemoteAuth<'a> {
    pub fn anonymous(storage: &'a SecretStorage, identity: &'a Identity) -> Self {
        Self {
            storage,
            identity,
            credential: CredentialUse::Anonymous,
        }
    }

    pub fn stored(storage: &'a SecretStorage, identity: &'a Identity, credential: &'a Credential) -> Self {
        Self {
            storage,
            identity,
            credential: CredentialUse::Stored(credential),
        }
    }

    pub fn candidate(
        storage: &'a SecretStorage,
        identity: &'a Identity,
        credential: &'a Credential,
    ) -> Self {
        Self {
            storage,
            identity,
            credential: CredentialUse::Candidate(credential),
        }
    }
}

/// Errors that can occur during SCM operations
#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("Invalid repository format for {scm_type} at path: {path}")]
    InvalidRepository { scm_type: ScmType, path: String },

    #[error("Repository metadata could not be read: {message}")]
    Metadata { message: String },

    #[error("SCM executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    #[error("Command timed out after {seconds} seconds: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Command execution failed: {command}, exit code: {exit_code}, stderr: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Credential relay could not be prepared: {message}")]
    Relay { message: String },
}

impl ScmError {
    /// Create an invalid repository error
    pub fn invalid_repository(scm_type: ScmType, path: &Path) -> Self {
        Self::InvalidRepository {
            scm_type,
            path: path.display().to_string(),
        }
    }

    /// Create a metadata error
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    /// Create an executable not found error
    pub fn executable_not_found(executable: impl Into<String>) -> Self {
        Self::ExecutableNotFound {
            executable: executable.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(command: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            command: command.into(),
            seconds,
        }
    }

    /// Create a command failed error
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a relay error
    pub fn relay(message: impl Into<String>) -> Self {
        Self::Relay {
            message: message.into(),
        }
    }
}

impl From<git2::Error> for ScmError {
    fn from(error: git2::Error) -> Self {
        Self::metadata(error.message())
    }
}
