use serde::{Deserialize, Serialize};
use std::fmt;

use super::remote_url::RemoteUrl;
use super::scm_type::ScmType;

/// How a remote authenticates, as far as this tool is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// The transport cannot authenticate (local clones, `git://`).
    NoAuth,
    /// Username and password, kept in the secure store.
    UsernamePassword,
    /// Authentication is handled by an OS-level agent (SSH keys).
    AgentDelegated,
}

impl AuthMethod {
    /// Pick the method for a remote of the given kind.
    pub fn for_remote(kind: ScmType, url: &RemoteUrl) -> Self {
        let scheme = url.scheme();
        match kind {
            ScmType::Git => match scheme {
                "http" | "https" | "ftp" | "ftps" => AuthMethod::UsernamePassword,
                "git" | "file" => AuthMethod::NoAuth,
                _ => AuthMethod::AgentDelegated,
            },
            ScmType::Svn => match scheme {
                "file" => AuthMethod::NoAuth,
                "svn+ssh" => AuthMethod::AgentDelegated,
                _ => AuthMethod::UsernamePassword,
            },
        }
    }

    /// Whether the secure store holds facts and credentials for this method.
    pub fn uses_secure_store(&self) -> bool {
        matches!(self, AuthMethod::UsernamePassword)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::NoAuth => write!(f, "no-auth"),
            AuthMethod::UsernamePassword => write!(f, "username-password"),
            AuthMethod::AgentDelegated => write!(f, "agent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(kind: ScmType, url: &str) -> AuthMethod {
        AuthMethod::for_remote(kind, &RemoteUrl::parse(url).unwrap())
    }

    #[test]
    fn test_git_methods() {
        assert_eq!(method(ScmType::Git, "https://example.org/r.git"), AuthMethod::UsernamePassword);
        assert_eq!(method(ScmType::Git, "http://example.org/r.git"), AuthMethod::UsernamePassword);
        assert_eq!(method(ScmType::Git, "git://example.org/r.git"), AuthMethod::NoAuth);
        assert_eq!(method(ScmType::Git, "/srv/git/r.git"), AuthMethod::NoAuth);
        assert_eq!(method(ScmType::Git, "git@example.org:r.git"), AuthMethod::AgentDelegated);
        assert_eq!(method(ScmType::Git, "ssh://example.org/r.git"), AuthMethod::AgentDelegated);
    }

    #[test]
    fn test_svn_methods() {
        assert_eq!(method(ScmType::Svn, "https://svn.example.org/repos"), AuthMethod::UsernamePassword);
        assert_eq!(method(ScmType::Svn, "svn://svn.example.org/repos"), AuthMethod::UsernamePassword);
        assert_eq!(method(ScmType::Svn, "svn+ssh://svn.example.org/repos"), AuthMethod::AgentDelegated);
        assert_eq!(method(ScmType::Svn, "file:///srv/svn/repos"), AuthMethod::NoAuth);
    }

    #[test]
    fn test_secure_store_usage() {
        assert!(AuthMethod::UsernamePassword.uses_secure_store());
        assert!(!AuthMethod::NoAuth.uses_secure_store());
        assert!(!AuthMethod::AgentDelegated.uses_secure_store());
    }
}
