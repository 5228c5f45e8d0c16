//! Fake services for testing
//!
//! `FakeScm` stands in for an SCM driver: it reads remotes from a table
//! instead of working copy metadata and answers probes and updates the way
//! a scripted server would. `ScriptedPrompter` replays canned answers.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sync_repos::application::services::{CredentialPrompter, PromptAnswer};
use sync_repos::domain::entities::{Remote, Repository};
use sync_repos::domain::value_objects::{Credential, ScmType};
use sync_repos::infrastructure::process::CommandOutput;
use sync_repos::infrastructure::scm::{CredentialUse, RemoteAuth, ScmError, ScmOperations};
use sync_repos::common::result::SyncReposResult;

/// How a fake server behaves.
#[derive(Debug, Clone)]
pub enum FakeServer {
    /// Anyone may read.
    Open,
    /// Only this username and password are accepted.
    Authenticating { username: String, password: String },
    /// Every command fails with a non-authentication error.
    Unreachable,
}

impl FakeServer {
    pub fn authenticating(username: &str, password: &str) -> Self {
        FakeServer::Authenticating {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn answer(&self, kind: ScmType, credential: Option<&Credential>) -> CommandOutput {
        let auth_failure = match kind {
            ScmType::Git => "fatal: Authentication failed for 'https://example.org/'",
            ScmType::Svn => "svn: E170001: Authentication failed",
        };
        match (self, credential) {
            (FakeServer::Open, _) => CommandOutput::new(0, "", ""),
            (FakeServer::Unreachable, _) => {
                CommandOutput::new(128, "", "fatal: unable to access: Could not resolve host")
            }
            (FakeServer::Authenticating { username, password }, Some(credential))
                if credential.username() == username && credential.expose_password() == password =>
            {
                CommandOutput::new(0, "", "")
            }
            (FakeServer::Authenticating { .. }, _) => CommandOutput::new(1, "", auth_failure),
        }
    }
}

/// One recorded update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub url: String,
    pub username: Option<String>,
}

/// Scripted SCM driver.
pub struct FakeScm {
    kind: ScmType,
    remotes: HashMap<String, Vec<(String, String)>>,
    servers: HashMap<String, FakeServer>,
    probes: AtomicUsize,
    updates: Mutex<Vec<UpdateCall>>,
}

impl FakeScm {
    pub fn new(kind: ScmType) -> Self {
        Self {
            kind,
            remotes: HashMap::new(),
            servers: HashMap::new(),
            probes: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Give the working copy in directory `dir_name` a remote.
    pub fn with_remote(mut self, dir_name: &str, remote: &str, url: &str) -> Self {
        self.remotes
            .entry(dir_name.to_string())
            .or_default()
            .push((remote.to_string(), url.to_string()));
        self
    }

    pub fn with_server(mut self, url: &str, server: FakeServer) -> Self {
        self.servers.insert(url.to_string(), server);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    fn server(&self, remote: &Remote) -> &FakeServer {
        self.servers
            .get(remote.url.as_str())
            .unwrap_or(&FakeServer::Open)
    }
}

#[async_trait]
impl ScmOperations for FakeScm {
    fn scm_type(&self) -> ScmType {
        self.kind
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(self.kind.metadata_dir()).is_dir()
    }

    async fn open_repository(&self, path: &Path) -> Result<Repository, ScmError> {
        let dir_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let remotes = self
            .remotes
            .get(dir_name)
            .ok_or_else(|| ScmError::invalid_repository(self.kind, path))?
            .iter()
            .map(|(name, url)| Remote::parse(name.as_str(), url))
            .collect::<SyncReposResult<Vec<_>>>()
            .map_err(|e| ScmError::metadata(e.to_string()))?;

        Repository::new(path, path.join(self.kind.metadata_dir()), self.kind, remotes)
            .map_err(|e| ScmError::metadata(e.to_string()))
    }

    async fn probe(
        &self,
        _repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let credential = match auth.credential {
            CredentialUse::Candidate(credential) => Some(credential),
            _ => None,
        };
        Ok(self.server(remote).answer(self.kind, credential))
    }

    async fn update(
        &self,
        _repository: &Repository,
        remote: &Remote,
        auth: &RemoteAuth<'_>,
    ) -> Result<CommandOutput, ScmError> {
        let credential = auth.credential.credential();
        self.updates.lock().unwrap().push(UpdateCall {
            url: remote.url.as_str().to_string(),
            username: credential.map(|c| c.username().to_string()),
        });
        Ok(self.server(remote).answer(self.kind, credential))
    }
}

/// Prompter replaying canned answers and counting interactions.
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<PromptAnswer>>>,
    asked: Arc<Mutex<Vec<String>>>,
    notices: Arc<AtomicUsize>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(self, answer: PromptAnswer) -> Self {
        self.answers.lock().unwrap().push_back(answer);
        self
    }

    pub fn with_credential(self, username: &str, password: &str) -> Self {
        self.answering(PromptAnswer::Credential(Credential::new(username, password)))
    }

    /// URLs asked about, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn notices_shown(&self) -> usize {
        self.notices.load(Ordering::SeqCst)
    }
}

impl CredentialPrompter for ScriptedPrompter {
    fn show_security_notice(&mut self) {
        self.notices.fetch_add(1, Ordering::SeqCst);
    }

    fn ask(&mut self, url: &str) -> SyncReposResult<PromptAnswer> {
        self.asked.lock().unwrap().push(url.to_string());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("prompted more often than scripted"))
    }
}
