use super::scm_interface::{RemoteAuth, ScmError, ScmOperations};
use crate::domain::entities::{Remote, Repository};
use crate::domain::value_objects::ScmType;
use crate::infrastructure::process::{CommandInvocation, CommandOutput, CommandRunner};
use async_trait::async_trait;
use secrecy::SecretString;
use std::path::Path;
use std::sync::Arc;

/// Name given to the single remote of a working copy: its repository root.
pub const ROOT_REMOTE: &str = "root";

/// SVN (Subversion) implementation of SCM operations
pub struct SvnScm {
    svn_executable: String,
    runner: Arc<dyn CommandRunner>,
}

impl SvnScm {
    /// Create a new SVN SCM instance
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_executable(runner, "svn")
    }

    /// Create a new SVN SCM instance with custom executable path
    pub fn with_executable(runner: Arc<dyn CommandRunner>, executable: impl Into<String>) -> Self {
        Self {
            svn_executable: executable.into(),
            runner,
        }
    }

    /// Build a non-interactive SVN command that never caches credentials.
    ///
    /// With a credential the password goes to stdin, never to the arguments.
    fn svn_command(&self, path: &Path, args: &[&str], auth: &RemoteAuth<'_>) -> CommandInvocation {
        let mut invocation = CommandInvocation::new(&self.svn_executable)
            .args(args.iter().copied())
            .args(["--no-auth-cache", "--non-interactive"])
            .with_working_directory(path);

        if let Some(credential) = auth.credential.credential() {
            invocation = invocation
                .args(["--username", credential.username()])
                .arg("--password-from-stdin")
                .with_stdin_secret(SecretString::from(credential.expose_password().to_string()));
        }
        invocation
    }

    /// Execute an SVN command and check for success
    async fn execute_svn_command_checked(&self, path: &Path, args: &[&str]) -> Result<String, ScmError> {
        let invocation = CommandInvocation::new(&self.svn_executable)
            .args(args.iter().copied())
            .arg("--non-interactive")
            .with_working_directory(path);
        let output = self.runner.run(&invocation).await?;

        if !output.success() {
            return Err(ScmError::command_failed(
                invocation.display(),
                output.exit_code,
                output.stderr,
            ));
        }

        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl ScmOperations for SvnScm {
    fn scm_type(&self) -> ScmType {
        ScmType::Svn
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".svn").exists()
    }

    async fn open_repository(&self, path: &Path) -> Result<Repository, ScmError> {
        if !self.is_repository(path) {
            return Err(ScmError::invalid_repository(ScmType::Svn, path));
        }

        let root = self
            .execute_svn_command_checked(path, &["info", "--show-item", "repos-root-url"])
            .await?;
        let remote = Remote::parse(ROOT_REMOTE, &root).map_err(|e| ScmError::metadata(e.to_string()))?;

        Repository::new(path, path.join(".svn"), ScmType::Svn, vec![remote])
            .map_err(|e| ScmError::metadata(e.to_string()))
    }

    async fn probe(
        &self,
        repository: &Repository,
        _remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        let invocation = self.svn_command(repository.path(), &["log", "--limit", "1"], auth);
        self.runner.run(&invocation).await
    }

    async fn update(
        &self,
        repository: &Repository,
        _remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        let invocation = self.svn_command(repository.path(), &["update"], auth);
        self.runner.run(&invocation).await
    }
}
