use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::entities::{Remote, Repository};
use crate::domain::value_objects::{AuthMethod, Credential, Identity};
use crate::infrastructure::keyring::SecretStorage;
use crate::infrastructure::scm::{RemoteAuth, ScmError, ScmOperations};

/// Decides whether a remote needs authentication, and whether a credential
/// is accepted by it.
pub enum AuthChecker {
    /// The transport never authenticates.
    NoAuth,
    /// An external agent (SSH) authenticates; nothing to check.
    AgentDelegated,
    UsernamePassword(UsernamePasswordChecker),
}

/// Probe-based checker for username/password remotes.
pub struct UsernamePasswordChecker {
    scm: Arc<dyn ScmOperations>,
    storage: SecretStorage,
    repository: Repository,
    remote: Remote,
    identity: Identity,
    credential: Option<Credential>,
}

impl AuthChecker {
    /// Build the checker matching the remote's authentication method.
    ///
    /// `username` and `password` go together: giving exactly one of them is
    /// an `InvalidArgument` error.
    pub fn for_remote(
        scm: Arc<dyn ScmOperations>,
        storage: &SecretStorage,
        repository: &Repository,
        remote: &Remote,
        username: Option<String>,
        password: Option<SecretString>,
    ) -> SyncReposResult<Self> {
        let credential = Credential::from_parts(username, password)?;

        Ok(match repository.auth_method_for(remote) {
            AuthMethod::NoAuth => AuthChecker::NoAuth,
            AuthMethod::AgentDelegated => AuthChecker::AgentDelegated,
            AuthMethod::UsernamePassword => AuthChecker::UsernamePassword(UsernamePasswordChecker {
                scm,
                storage: storage.clone(),
                identity: repository.identity_for(remote),
                repository: repository.clone(),
                remote: remote.clone(),
                credential,
            }),
        })
    }

    /// `true` when the remote refuses anonymous access.
    pub async fn check(&self) -> SyncReposResult<bool> {
        match self {
            AuthChecker::NoAuth | AuthChecker::AgentDelegated => Ok(false),
            AuthChecker::UsernamePassword(checker) => checker.probe(false).await,
        }
    }

    /// `true` when the remote accepts the credential given at construction.
    pub async fn check_credentials(&self) -> SyncReposResult<bool> {
        match self {
            AuthChecker::NoAuth | AuthChecker::AgentDelegated => Ok(true),
            AuthChecker::UsernamePassword(checker) => {
                if checker.credential.is_none() {
                    return Err(SyncError::invalid_argument(
                        "credential",
                        "no credential was given to validate",
                    ));
                }
                Ok(!checker.probe(true).await?)
            }
        }
    }
}

impl UsernamePasswordChecker {
    /// Run the probe. `Ok(true)` means the remote rejected the attempt with
    /// an authentication failure.
    async fn probe(&self, with_credential: bool) -> SyncReposResult<bool> {
        let auth = match (&self.credential, with_credential) {
            (Some(credential), true) => {
                RemoteAuth::candidate(&self.storage, &self.identity, credential)
            }
            _ => RemoteAuth::anonymous(&self.storage, &self.identity),
        };

        let output = self
            .scm
            .probe(&self.repository, &self.remote, &auth)
            .await
            .map_err(|e| SyncError::auth_probe_failure(&self.remote.name, e))?;

        if output.success() {
            debug!("Probe of '{}' succeeded", self.remote.url);
            return Ok(false);
        }

        let combined = output.combined();
        if self.repository.kind.is_auth_failure(&combined) {
            debug!("Probe of '{}' hit an authentication failure", self.remote.url);
            return Ok(true);
        }

        Err(SyncError::auth_probe_failure(
            &self.remote.name,
            ScmError::command_failed(
                format!("{} probe of {}", self.repository.kind, self.remote.url),
                output.exit_code,
                combined.trim(),
            ),
        ))
    }
}
