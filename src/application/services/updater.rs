use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::entities::{Remote, Repository};
use crate::domain::value_objects::Credential;
use crate::infrastructure::keyring::SecretStorage;
use crate::infrastructure::scm::{RemoteAuth, ScmError, ScmOperations};

/// Brings a working copy up to date from one remote.
///
/// Only reads the store: stored credentials are handed to the SCM as they
/// are, and Git picks them up through the relay.
pub struct Updater {
    storage: SecretStorage,
}

impl Updater {
    pub fn new(storage: SecretStorage) -> Self {
        Self { storage }
    }

    /// Try every credential in turn, or a single anonymous attempt when there
    /// are none. Stops at the first success; fails only when every attempt
    /// failed, reporting the last failure.
    pub async fn update_remote(
        &self,
        scm: &Arc<dyn ScmOperations>,
        repository: &Repository,
        remote: &Remote,
        credentials: &[Credential],
    ) -> SyncReposResult<()> {
        let identity = repository.identity_for(remote);
        let attempts: Vec<RemoteAuth<'_>> = if credentials.is_empty() {
            vec![RemoteAuth::anonymous(&self.storage, &identity)]
        } else {
            credentials
                .iter()
                .map(|credential| RemoteAuth::stored(&self.storage, &identity, credential))
                .collect()
        };

        let mut last_error = None;
        for auth in &attempts {
            let user = auth.credential.credential().map(Credential::username);
            let failure = match scm.update(repository, remote, auth).await {
                Ok(output) if output.success() => {
                    debug!(
                        "Updated {} from '{}'{}",
                        repository,
                        remote.name,
                        user.map(|u| format!(" as '{}'", u)).unwrap_or_default()
                    );
                    return Ok(());
                }
                Ok(output) => ScmError::command_failed(
                    format!("{} update from {}", repository.kind, remote.name),
                    output.exit_code,
                    output.combined().trim(),
                ),
                Err(e) => e,
            };

            if let Some(user) = user {
                warn!("Update of {} from '{}' as '{}' failed", repository, remote.name, user);
            }
            last_error = Some(failure);
        }

        let error = last_error
            .unwrap_or_else(|| ScmError::command_failed(remote.name.clone(), -1, "no update attempted"));
        Err(SyncError::update_failure(repository.path(), &remote.name, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ScmType;
    use crate::infrastructure::keyring::MemoryBackend;
    use crate::infrastructure::process::{CommandOutput, MockCommandRunner};
    use crate::infrastructure::scm::svn_scm::{SvnScm, ROOT_REMOTE};
    use mockall::predicate::always;
    use mockall::Sequence;

    fn working_copy() -> Repository {
        Repository::new(
            "/src/wc",
            "/src/wc/.svn",
            ScmType::Svn,
            vec![Remote::parse(ROOT_REMOTE, "https://svn.example.org/repos/p").unwrap()],
        )
        .unwrap()
    }

    fn updater() -> Updater {
        Updater::new(SecretStorage::open(Arc::new(MemoryBackend::new())).unwrap())
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let mut runner = MockCommandRunner::new();
        let mut sequence = Sequence::new();
        runner
            .expect_run()
            .with(always())
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(CommandOutput::new(1, "", "svn: E170001: Authentication failed")));
        runner
            .expect_run()
            .withf(|invocation| invocation.args.iter().any(|a| a == "bob"))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(CommandOutput::new(0, "At revision 7.", "")));

        let scm: Arc<dyn ScmOperations> = Arc::new(SvnScm::new(Arc::new(runner)));
        let repo = working_copy();
        let remote = repo.get_remote(ROOT_REMOTE).unwrap().clone();
        let credentials = vec![
            Credential::new("alice", "a"),
            Credential::new("bob", "b"),
            Credential::new("carol", "c"),
        ];

        updater()
            .update_remote(&scm, &repo, &remote, &credentials)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_attempts_failing_is_update_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(2)
            .returning(|_| Ok(CommandOutput::new(1, "", "svn: E170013: Unable to connect")));

        let scm: Arc<dyn ScmOperations> = Arc::new(SvnScm::new(Arc::new(runner)));
        let repo = working_copy();
        let remote = repo.get_remote(ROOT_REMOTE).unwrap().clone();
        let credentials = vec![Credential::new("alice", "a"), Credential::new("bob", "b")];

        let error = updater()
            .update_remote(&scm, &repo, &remote, &credentials)
            .await
            .unwrap_err();
        assert!(matches!(error, SyncError::UpdateFailure { .. }));
        assert!(error.to_string().contains("E170013"));
    }

    #[tokio::test]
    async fn test_single_anonymous_attempt() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|invocation| invocation.stdin.is_none())
            .times(1)
            .returning(|_| Ok(CommandOutput::new(0, "", "")));

        let scm: Arc<dyn ScmOperations> = Arc::new(SvnScm::new(Arc::new(runner)));
        let repo = working_copy();
        let remote = repo.get_remote(ROOT_REMOTE).unwrap().clone();

        updater().update_remote(&scm, &repo, &remote, &[]).await.unwrap();
    }
}
