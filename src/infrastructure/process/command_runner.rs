use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::infrastructure::scm::scm_interface::ScmError;

/// A fully described subprocess run.
///
/// Arguments never carry secrets, so [`CommandInvocation::display`] is always
/// safe to print. A password travels through `stdin` instead.
#[derive(Debug, Default)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment_variables: BTreeMap<String, String>,
    pub stdin: Option<SecretString>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_environment_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_environment_variables(mut self, vars: BTreeMap<String, String>) -> Self {
        self.environment_variables.extend(vars);
        self
    }

    /// Write `secret` followed by a newline to the child's stdin.
    pub fn with_stdin_secret(mut self, secret: SecretString) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// `program arg1 arg2 ...`
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr together, for signature matching.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs external commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is a normal `Ok` output; only
    /// failing to spawn, wait or finish in time is an error.
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, ScmError>;
}

/// [`CommandRunner`] on top of `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner {
    timeout: Option<Duration>,
}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill children that run longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn run_to_completion(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<CommandOutput, ScmError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.environment_variables)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        if let Some(dir) = &invocation.working_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScmError::executable_not_found(&invocation.program),
            _ => ScmError::from(e),
        })?;

        if let Some(secret) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(secret.expose_secret().as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                // dropping closes the pipe
            }
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, ScmError> {
        debug!("Running: {}", invocation.display());
        match self.timeout {
            Some(limit) => timeout(limit, self.run_to_completion(invocation))
                .await
                .map_err(|_| ScmError::timeout(invocation.display(), limit.as_secs()))?,
            None => self.run_to_completion(invocation).await,
        }
    }
}
