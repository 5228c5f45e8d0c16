use super::scm_interface::{CredentialUse, RemoteAuth, ScmError, ScmOperations};
use crate::domain::entities::{Remote, Repository};
use crate::domain::value_objects::{AuthMethod, ScmType};
use crate::infrastructure::askpass::RelaySession;
use crate::infrastructure::process::{CommandInvocation, CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Git implementation of SCM operations
pub struct GitScm {
    git_executable: String,
    runner: Arc<dyn CommandRunner>,
    askpass_helper: PathBuf,
}

impl GitScm {
    /// Create a new Git SCM instance
    ///
    /// The running executable answers Git's credential prompts.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            git_executable: "git".to_string(),
            runner,
            askpass_helper: std::env::current_exe()
                .unwrap_or_else(|_| PathBuf::from(env!("CARGO_PKG_NAME"))),
        }
    }

    /// Create a new Git SCM instance with custom executable path
    pub fn with_executable(runner: Arc<dyn CommandRunner>, executable: impl Into<String>) -> Self {
        Self {
            git_executable: executable.into(),
            ..Self::new(runner)
        }
    }

    /// Use another program as `GIT_ASKPASS`
    pub fn with_askpass_helper(mut self, helper: impl Into<PathBuf>) -> Self {
        self.askpass_helper = helper.into();
        self
    }

    /// Base invocation inside the working copy. Git must never fall back to
    /// prompting on the terminal.
    fn git_command(&self, repository: &Repository, args: &[&str]) -> CommandInvocation {
        CommandInvocation::new(&self.git_executable)
            .args(args.iter().copied())
            .with_working_directory(repository.path())
            .with_environment_variable("GIT_TERMINAL_PROMPT", "0")
    }

    /// The relay that answers Git's prompts for this run, if it needs one.
    fn relay_session(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<Option<RelaySession>, ScmError> {
        let session = match auth.credential {
            CredentialUse::Candidate(credential) => RelaySession::create_with_credentials(
                &self.askpass_helper,
                auth.storage,
                credential,
                auth.identity,
            ),
            CredentialUse::Stored(credential) => {
                RelaySession::create(&self.askpass_helper, auth.identity, Some(credential.username()))
            }
            CredentialUse::Anonymous
                if repository.auth_method_for(remote) == AuthMethod::UsernamePassword =>
            {
                RelaySession::create(&self.askpass_helper, auth.identity, None)
            }
            CredentialUse::Anonymous => return Ok(None),
        };
        session
            .map(Some)
            .map_err(|e| ScmError::relay(e.to_string()))
    }

    /// Run `args` with the relay for `auth` in place
    async fn execute_git_command(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
        args: &[&str],
    ) -> Result<CommandOutput, ScmError> {
        let session = self.relay_session(repository, remote, auth)?;
        let mut invocation = self.git_command(repository, args);
        if let Some(session) = &session {
            invocation = invocation.with_environment_variables(session.environment().clone());
        }

        let output = self.runner.run(&invocation).await;
        // the session outlives the child and cleans up after it
        drop(session);
        output
    }

    /// Read remotes and the `alias.update` setting through libgit2
    fn read_repository(path: &Path) -> Result<Repository, ScmError> {
        let repo = git2::Repository::open(path)?;

        let mut remotes = Vec::new();
        for name in repo.remotes()?.iter().flatten() {
            let remote = repo.find_remote(name)?;
            let Some(url) = remote.url() else {
                warn!("Remote '{}' of {} has no usable URL", name, path.display());
                continue;
            };
            match Remote::parse(name, url) {
                Ok(remote) => remotes.push(remote),
                Err(e) => warn!("Skipping remote '{}' of {}: {}", name, path.display(), e),
            }
        }

        // every config level counts, as it would for `git config --get`
        let custom_update_command = repo
            .config()
            .and_then(|config| config.get_string("alias.update"))
            .is_ok();

        let repository = Repository::new(path, repo.path(), ScmType::Git, remotes)
            .map_err(|e| ScmError::metadata(e.to_string()))?
            .with_custom_update_command(custom_update_command);
        Ok(repository)
    }
}

#[async_trait]
impl ScmOperations for GitScm {
    fn scm_type(&self) -> ScmType {
        ScmType::Git
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".git").exists()
    }

    async fn open_repository(&self, path: &Path) -> Result<Repository, ScmError> {
        if !self.is_repository(path) {
            return Err(ScmError::invalid_repository(ScmType::Git, path));
        }
        let repository = Self::read_repository(path)?;
        debug!(
            "Found {} with {} remote(s)",
            repository,
            repository.remotes().len()
        );
        Ok(repository)
    }

    async fn probe(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        self.execute_git_command(repository, remote, auth, &["remote", "show", remote.name.as_str()])
            .await
    }

    async fn update(
        &self,
        repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        let subcommand = if repository.custom_update_command {
            "update"
        } else {
            "fetch"
        };
        self.execute_git_command(repository, remote, auth, &[subcommand, remote.name.as_str()])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Credential, Identity};
    use crate::infrastructure::askpass::{ENV_ACTIVATE, ENV_GIT_ASKPASS, ENV_PROTOCOL, ENV_USER};
    use crate::infrastructure::keyring::{MemoryBackend, SecretStorage};
    use crate::infrastructure::process::MockCommandRunner;
    use tempfile::TempDir;

    fn storage() -> SecretStorage {
        SecretStorage::open(Arc::new(MemoryBackend::new())).unwrap()
    }

    fn repository(url: &str) -> Repository {
        Repository::new(
            "/src/project",
            "/src/project/.git",
            ScmType::Git,
            vec![Remote::parse("origin", url).unwrap()],
        )
        .unwrap()
    }

    fn init_repository(dir: &Path, remotes: &[(&str, &str)]) {
        let repo = git2::Repository::init(dir).unwrap();
        for (name, url) in remotes {
            repo.remote(name, url).unwrap();
        }
    }

    #[tokio::test]
    async fn test_probe_uses_relay_for_password_remotes() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|invocation| {
                invocation.args == ["remote", "show", "origin"]
                    && invocation.environment_variables["GIT_TERMINAL_PROMPT"] == "0"
                    && invocation.environment_variables[ENV_ACTIVATE] == "1"
                    && invocation.environment_variables[ENV_GIT_ASKPASS] == "/opt/sync-repos"
                    && !invocation.environment_variables.contains_key(ENV_USER)
            })
            .times(1)
            .returning(|_| Ok(CommandOutput::new(0, "* remote origin", "")));

        let git = GitScm::new(Arc::new(runner)).with_askpass_helper("/opt/sync-repos");
        let repo = repository("https://example.org/r.git");
        let remote = repo.get_remote("origin").unwrap().clone();
        let identity = repo.identity_for(&remote);
        let storage = storage();

        let output = git
            .probe(&repo, &remote, &RemoteAuth::anonymous(&storage, &identity))
            .await
            .unwrap();
        assert!(output.success());
    }

    #[tokio::test]
    async fn test_candidate_credential_is_relayed_from_temporary_identity() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|invocation| {
                invocation.environment_variables[ENV_PROTOCOL] == "temp"
                    && invocation.environment_variables[ENV_USER] == "alice"
                    && invocation.args.iter().all(|arg| !arg.contains("s3cr3t"))
            })
            .times(1)
            .returning(|_| Ok(CommandOutput::new(128, "", "fatal: Authentication failed")));

        let git = GitScm::new(Arc::new(runner));
        let repo = repository("https://example.org/r.git");
        let remote = repo.get_remote("origin").unwrap().clone();
        let identity = repo.identity_for(&remote);
        let storage = storage();
        let credential = Credential::new("alice", "s3cr3t");

        git.probe(&repo, &remote, &RemoteAuth::candidate(&storage, &identity, &credential))
            .await
            .unwrap();

        // the parked credential is gone once the probe has finished
        let temporary: Identity = identity.temporary();
        assert_eq!(
            storage.is_requiring_authentication(&temporary).unwrap(),
            crate::domain::entities::AuthFact::Unknown
        );
    }

    #[tokio::test]
    async fn test_update_without_relay_for_agent_remotes() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|invocation| {
                invocation.args == ["fetch", "origin"]
                    && !invocation.environment_variables.contains_key(ENV_ACTIVATE)
            })
            .times(1)
            .returning(|_| Ok(CommandOutput::new(0, "", "")));

        let git = GitScm::new(Arc::new(runner));
        let repo = repository("git@example.org:me/r.git");
        let remote = repo.get_remote("origin").unwrap().clone();
        let identity = repo.identity_for(&remote);
        let storage = storage();

        git.update(&repo, &remote, &RemoteAuth::anonymous(&storage, &identity))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_uses_custom_alias() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|invocation| invocation.args == ["update", "origin"])
            .times(1)
            .returning(|_| Ok(CommandOutput::new(0, "", "")));

        let git = GitScm::new(Arc::new(runner));
        let repo = repository("git://example.org/r.git").with_custom_update_command(true);
        let remote = repo.get_remote("origin").unwrap().clone();
        let identity = repo.identity_for(&remote);
        let storage = storage();

        git.update(&repo, &remote, &RemoteAuth::anonymous(&storage, &identity))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_repository_reads_remotes() {
        let temp = TempDir::new().unwrap();
        init_repository(
            temp.path(),
            &[
                ("upstream", "https://example.org/upstream/r.git"),
                ("origin", "git@example.org:me/r.git"),
            ],
        );

        let git = GitScm::new(Arc::new(MockCommandRunner::new()));
        let repo = git.open_repository(temp.path()).await.unwrap();

        let names: Vec<&str> = repo.remotes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["origin", "upstream"]);
        assert_eq!(repo.kind, ScmType::Git);
        assert_eq!(repo.get_remote("origin").unwrap().url.scheme(), "ssh");
    }

    #[tokio::test]
    async fn test_open_non_repository_fails() {
        let temp = TempDir::new().unwrap();
        let git = GitScm::new(Arc::new(MockCommandRunner::new()));
        assert!(!git.is_repository(temp.path()));
        assert!(git.open_repository(temp.path()).await.is_err());
    }
}
