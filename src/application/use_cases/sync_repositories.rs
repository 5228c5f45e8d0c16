use colored::Colorize;
use futures::stream::{self, StreamExt};
use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::application::services::{AuthChecker, CredentialPrompter, PromptAnswer, Updater};
use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::entities::{CredentialLookup, Remote, Repository};
use crate::domain::value_objects::{Credential, Identity, ScmType};
use crate::infrastructure::filesystem::discover_repositories;
use crate::infrastructure::keyring::SecretStorage;
use crate::infrastructure::scm::ScmOperations;

/// リポジトリ同期の設定
#[derive(Debug, Clone, Validate)]
pub struct SyncRepositoriesConfig {
    /// 探索を開始するディレクトリ
    pub root: PathBuf,

    /// 無人モード（ユーザーへの問い合わせを一切行わない）
    pub daemon: bool,

    /// 新しく見つかったリモートの初回セットアップを行わない
    pub no_setup: bool,

    /// 更新フェーズの並列実行数
    #[validate(range(min = 1, max = 256))]
    pub parallel_jobs: usize,

    /// サブプロセスのタイムアウト（秒）
    #[validate(range(min = 1, max = 86400))]
    pub timeout_seconds: Option<u64>,

    /// 詳細ログを出力するか
    pub verbose: bool,
}

impl SyncRepositoriesConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            daemon: false,
            no_setup: false,
            parallel_jobs: 1,
            timeout_seconds: None,
            verbose: false,
        }
    }

    pub fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn with_no_setup(mut self, no_setup: bool) -> Self {
        self.no_setup = no_setup;
        self
    }

    /// `0` は CPU 数として扱う
    pub fn with_parallel_jobs(mut self, parallel_jobs: usize) -> Self {
        self.parallel_jobs = if parallel_jobs == 0 {
            num_cpus::get()
        } else {
            parallel_jobs
        };
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: Option<u64>) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// 更新対象から外した理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 認証要否が未記録で、初回セットアップが無効
    SetupDisabled,
    /// 認証要否の確認に失敗した
    ProbeFailed(String),
    /// 認証情報が無く、無人モードのため問い合わせなかった
    Unattended,
    /// 入力された認証情報が拒否された
    InvalidCredentials,
    /// 作業コピーを読めなかった
    Unreadable(String),
    Error(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SetupDisabled => {
                write!(f, "authentication requirement unknown and first-time setup is disabled")
            }
            SkipReason::ProbeFailed(message) => write!(f, "authentication check failed: {}", message),
            SkipReason::Unattended => {
                write!(f, "authentication details unknown and running unattended")
            }
            SkipReason::InvalidCredentials => write!(f, "invalid credentials"),
            SkipReason::Unreadable(message) => write!(f, "unreadable working copy: {}", message),
            SkipReason::Error(message) => write!(f, "{}", message),
        }
    }
}

/// 報告の対象となる（リポジトリ、リモート）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub path: PathBuf,
    /// 作業コピー自体を読めなかった場合は `None`
    pub remote: Option<String>,
}

impl RemoteTarget {
    fn new(path: impl Into<PathBuf>, remote: Option<&str>) -> Self {
        Self {
            path: path.into(),
            remote: remote.map(str::to_string),
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote {
            Some(remote) => write!(f, "'{}' remote '{}'", self.path.display(), remote),
            None => write!(f, "'{}'", self.path.display()),
        }
    }
}

/// 同期操作の結果
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// 更新に成功したリモート
    pub updated: Vec<RemoteTarget>,

    /// 更新に失敗したリモートとエラー
    pub failed: Vec<(RemoteTarget, String)>,

    /// スキップされたリモートと理由
    pub skipped: Vec<(RemoteTarget, SkipReason)>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.updated.len() + self.failed.len() + self.skipped.len()
    }
}

/// リモートごとの判定結果
enum Readiness {
    Ready(Vec<Credential>),
    Skip(SkipReason),
}

/// 更新フェーズに渡すリモート
struct UpdateJob {
    scm: Arc<dyn ScmOperations>,
    repository: Repository,
    remote: Remote,
    credentials: Vec<Credential>,
}

/// リポジトリ同期のユースケース
///
/// 認証の確認と問い合わせは逐次に、更新は `parallel_jobs` 個まで並列に行う。
/// 更新フェーズはセキュアストアに書き込まない。
pub struct SyncRepositoriesUseCase {
    config: SyncRepositoriesConfig,
    storage: SecretStorage,
    scms: HashMap<ScmType, Arc<dyn ScmOperations>>,
    prompter: Box<dyn CredentialPrompter>,
    security_notice_shown: bool,
}

impl SyncRepositoriesUseCase {
    /// 新しいSyncRepositoriesUseCaseインスタンスを作成
    pub fn new(
        config: SyncRepositoriesConfig,
        storage: SecretStorage,
        scms: HashMap<ScmType, Arc<dyn ScmOperations>>,
        prompter: Box<dyn CredentialPrompter>,
    ) -> Self {
        Self {
            config,
            storage,
            scms,
            prompter,
            security_notice_shown: false,
        }
    }

    /// リポジトリ同期を実行
    ///
    /// リモート単位の失敗は報告に記録される。ストアのロックや設定の誤りなど
    /// 致命的なエラーのみが `Err` になる。
    pub async fn execute(&mut self) -> SyncReposResult<SyncReport> {
        // 1. 設定の検証
        self.config.validate()?;

        // 2. 作業コピーの探索
        println!(
            "{} Checking '{}' for repositories...",
            "::".blue().bold(),
            self.config.root.display()
        );
        let discovered = discover_repositories(&self.config.root)?;
        info!("Found {} working copies", discovered.len());

        // 3. 認証要否の確認（逐次）
        let mut report = SyncReport::new();
        let mut jobs = Vec::new();
        for found in discovered {
            let Some(scm) = self.scms.get(&found.kind).cloned() else {
                debug!("No {} support configured, skipping {}", found.kind, found.path.display());
                continue;
            };

            let repository = match scm.open_repository(&found.path).await {
                Ok(repository) => repository,
                Err(e) => {
                    let target = RemoteTarget::new(&found.path, None);
                    self.report_skip(&mut report, target, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };

            for remote in repository.remotes() {
                let target = RemoteTarget::new(repository.path(), Some(&remote.name));
                match self.prepare_remote(&scm, &repository, remote).await {
                    Ok(Readiness::Ready(credentials)) => jobs.push(UpdateJob {
                        scm: scm.clone(),
                        repository: repository.clone(),
                        remote: remote.clone(),
                        credentials,
                    }),
                    Ok(Readiness::Skip(reason)) => self.report_skip(&mut report, target, reason),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => self.report_skip(&mut report, target, SkipReason::Error(e.to_string())),
                }
            }
        }

        // 4. 更新（並列）
        self.update_all(jobs, &mut report).await;

        Ok(report)
    }

    /// 一つのリモートを更新できる状態にする
    async fn prepare_remote(
        &mut self,
        scm: &Arc<dyn ScmOperations>,
        repository: &Repository,
        remote: &Remote,
    ) -> SyncReposResult<Readiness> {
        if !repository.auth_method_for(remote).uses_secure_store() {
            return Ok(Readiness::Ready(Vec::new()));
        }

        let identity = repository.identity_for(remote);
        let mut lookup = self.storage.get_credentials(&identity)?;

        if matches!(lookup, CredentialLookup::Unknown) && !self.config.no_setup {
            let checker =
                AuthChecker::for_remote(scm.clone(), &self.storage, repository, remote, None, None)?;
            match checker.check().await {
                Ok(true) => {
                    info!("{} remote '{}' requires authentication", repository, remote.name);
                    self.storage.set_authenticated(&identity)?;
                }
                Ok(false) => {
                    info!("{} remote '{}' needs no authentication", repository, remote.name);
                    self.storage.set_unauthenticated(&identity)?;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => return Ok(Readiness::Skip(SkipReason::ProbeFailed(e.to_string()))),
            }
            lookup = self.storage.get_credentials(&identity)?;
        }

        match lookup {
            CredentialLookup::Unknown => Ok(Readiness::Skip(SkipReason::SetupDisabled)),
            CredentialLookup::NotRequired => Ok(Readiness::Ready(Vec::new())),
            CredentialLookup::Required(credentials) if !credentials.is_empty() => {
                Ok(Readiness::Ready(credentials))
            }
            CredentialLookup::Required(_) => {
                self.request_credentials(scm, repository, remote, &identity).await
            }
        }
    }

    /// 認証情報を問い合わせ、検証が通った場合のみ保存する
    async fn request_credentials(
        &mut self,
        scm: &Arc<dyn ScmOperations>,
        repository: &Repository,
        remote: &Remote,
        identity: &Identity,
    ) -> SyncReposResult<Readiness> {
        eprintln!(
            "{} {} remote '{}' needs authentication, but no credentials are known",
            "⚠".yellow().bold(),
            repository,
            remote.name
        );
        if self.config.daemon {
            return Ok(Readiness::Skip(SkipReason::Unattended));
        }

        if !self.security_notice_shown {
            self.prompter.show_security_notice();
            self.security_notice_shown = true;
        }

        let credential = match self.prompter.ask(&remote.url.redacted())? {
            PromptAnswer::NoAuthentication => {
                self.storage.set_unauthenticated(identity)?;
                return Ok(Readiness::Ready(Vec::new()));
            }
            PromptAnswer::Credential(credential) => credential,
        };

        let checker = AuthChecker::for_remote(
            scm.clone(),
            &self.storage,
            repository,
            remote,
            Some(credential.username().to_string()),
            Some(SecretString::from(credential.expose_password().to_string())),
        )?;

        match Self::verify_candidate(&checker, &credential, remote).await {
            Ok(()) => {
                self.storage
                    .set_credential(identity, credential.username(), credential.password())?;
                Ok(Readiness::Ready(vec![credential]))
            }
            Err(e @ SyncError::InvalidCredentials { .. }) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                self.purge_credential(identity, credential.username())?;
                Ok(Readiness::Skip(SkipReason::InvalidCredentials))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(Readiness::Skip(SkipReason::ProbeFailed(e.to_string()))),
        }
    }

    /// 候補の認証情報がサーバーに拒否された場合は `InvalidCredentials` を返す
    async fn verify_candidate(
        checker: &AuthChecker,
        credential: &Credential,
        remote: &Remote,
    ) -> SyncReposResult<()> {
        if checker.check_credentials().await? {
            Ok(())
        } else {
            Err(SyncError::invalid_credentials(
                credential.username(),
                remote.url.redacted(),
            ))
        }
    }

    fn purge_credential(&self, identity: &Identity, username: &str) -> SyncReposResult<()> {
        match self.storage.delete_credential(identity, username) {
            Ok(()) | Err(SyncError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn report_skip(&self, report: &mut SyncReport, target: RemoteTarget, reason: SkipReason) {
        eprintln!("{} {}: {} ... skipping", "⚠".yellow().bold(), target, reason);
        report.skipped.push((target, reason));
    }

    /// 準備のできたリモートを更新する
    async fn update_all(&self, jobs: Vec<UpdateJob>, report: &mut SyncReport) {
        if jobs.is_empty() {
            return;
        }

        println!("{} Performing repository updates...", "::".blue().bold());
        let updater = Updater::new(self.storage.clone());
        let verbose = self.config.verbose;

        let results: Vec<_> = stream::iter(jobs.into_iter().map(|job| {
            let updater = &updater;
            async move {
                if verbose {
                    println!(
                        "Updating '{}' from remote '{}'...",
                        job.repository.path().display(),
                        job.remote.name
                    );
                }
                let result = updater
                    .update_remote(&job.scm, &job.repository, &job.remote, &job.credentials)
                    .await;
                (job, result)
            }
        }))
        .buffer_unordered(self.config.parallel_jobs)
        .collect()
        .await;

        for (job, result) in results {
            let target = RemoteTarget::new(job.repository.path(), Some(&job.remote.name));
            match result {
                Ok(()) => {
                    println!("{} Updated {}", "✓".green().bold(), target);
                    report.updated.push(target);
                }
                Err(e) => {
                    warn!("{}", e);
                    eprintln!("{} Failed to update {}!", "✗".red().bold(), target);
                    report.failed.push((target, e.to_string()));
                }
            }
        }
    }
}
