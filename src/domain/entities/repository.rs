use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::value_objects::{AuthMethod, Identity, RemoteUrl, ScmType};

/// リモートリポジトリの情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// リモート名（例: origin、SVNの場合は root）
    pub name: String,
    /// リモートのURL
    pub url: RemoteUrl,
}

impl Remote {
    /// 新しいRemoteインスタンスを作成
    pub fn new(name: impl Into<String>, url: RemoteUrl) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// URL文字列を解析してRemoteを作成
    pub fn parse(name: impl Into<String>, url: &str) -> SyncReposResult<Self> {
        let name = name.into();
        let url = RemoteUrl::parse(url).map_err(|e| {
            SyncError::invalid_argument(format!("remote '{}'", name), e.to_string())
        })?;
        Ok(Self::new(name, url))
    }
}

/// 作業コピー（リポジトリ）エンティティ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// 作業コピーのパス
    pub path: PathBuf,

    /// メタデータディレクトリ（.git / .svn）
    pub datadir: PathBuf,

    /// SCMの種類
    pub kind: ScmType,

    /// リモートのリスト（名前順、名前は一意）
    remotes: Vec<Remote>,

    /// `git update` エイリアスが設定されているか
    pub custom_update_command: bool,
}

impl Repository {
    /// 新しいRepositoryインスタンスを作成
    ///
    /// リモート名が重複している場合はエラーになる。
    pub fn new(
        path: impl Into<PathBuf>,
        datadir: impl Into<PathBuf>,
        kind: ScmType,
        mut remotes: Vec<Remote>,
    ) -> SyncReposResult<Self> {
        let mut seen = HashSet::new();
        for remote in &remotes {
            if !seen.insert(remote.name.as_str()) {
                return Err(SyncError::invalid_argument(
                    "remotes",
                    format!("duplicate remote name '{}'", remote.name),
                ));
            }
        }
        remotes.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            path: path.into(),
            datadir: datadir.into(),
            kind,
            remotes,
            custom_update_command: false,
        })
    }

    /// カスタム update コマンドの有無を設定
    pub fn with_custom_update_command(mut self, custom_update_command: bool) -> Self {
        self.custom_update_command = custom_update_command;
        self
    }

    /// 作業コピーのパスを取得
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// すべてのリモートを取得
    pub fn remotes(&self) -> &[Remote] {
        &self.remotes
    }

    /// 特定の名前のリモートを取得
    pub fn get_remote(&self, name: &str) -> Option<&Remote> {
        self.remotes.iter().find(|r| r.name == name)
    }

    /// リモートの認証情報キー
    pub fn identity_for(&self, remote: &Remote) -> Identity {
        remote.url.identity(self.kind)
    }

    /// リモートの認証方式
    pub fn auth_method_for(&self, remote: &Remote) -> AuthMethod {
        AuthMethod::for_remote(self.kind, &remote.url)
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} @ {})", self.kind, self.path.display())
    }
}
