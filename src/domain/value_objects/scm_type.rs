use serde::{Deserialize, Serialize};
use std::fmt;

/// SCM (Source Control Management) system type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    /// Git version control system
    Git,
    /// Subversion (SVN) version control system
    Svn,
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmType::Git => write!(f, "git"),
            ScmType::Svn => write!(f, "svn"),
        }
    }
}

impl ScmType {
    /// Every SCM this tool knows how to update
    pub const ALL: [ScmType; 2] = [ScmType::Git, ScmType::Svn];

    /// Get the metadata directory name for this SCM
    pub fn metadata_dir(&self) -> &'static str {
        match self {
            ScmType::Git => ".git",
            ScmType::Svn => ".svn",
        }
    }

    /// Recognize an SCM from the name of a metadata directory
    pub fn from_metadata_dir(name: &str) -> Option<ScmType> {
        Self::ALL.into_iter().find(|scm| scm.metadata_dir() == name)
    }

    /// Output fragments that the executable prints when a remote rejected
    /// (or could not be given) credentials.
    pub fn auth_failure_signatures(&self) -> &'static [&'static str] {
        match self {
            ScmType::Git => &[
                "Authentication failed",
                "terminal prompts disabled",
                "could not read Username",
                "could not read Password",
            ],
            ScmType::Svn => &["Authentication failed", "E215004", "E170001"],
        }
    }

    /// Whether the combined output of a failed command means "authentication required"
    pub fn is_auth_failure(&self, output: &str) -> bool {
        self.auth_failure_signatures()
            .iter()
            .any(|signature| output.contains(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scm_type_display() {
        assert_eq!(ScmType::Git.to_string(), "git");
        assert_eq!(ScmType::Svn.to_string(), "svn");
    }

    #[test]
    fn test_scm_metadata_dirs() {
        assert_eq!(ScmType::Git.metadata_dir(), ".git");
        assert_eq!(ScmType::Svn.metadata_dir(), ".svn");
        assert_eq!(ScmType::from_metadata_dir(".svn"), Some(ScmType::Svn));
        assert_eq!(ScmType::from_metadata_dir(".hg"), None);
    }

    #[test]
    fn test_auth_failure_detection() {
        assert!(ScmType::Git.is_auth_failure(
            "remote: Invalid username or password.\nfatal: Authentication failed for 'https://example.org/r.git/'"
        ));
        assert!(ScmType::Svn.is_auth_failure(
            "svn: E215004: Authentication failed and interactive prompting is disabled"
        ));
        assert!(!ScmType::Git.is_auth_failure("fatal: unable to access: Could not resolve host"));
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ScmType::Svn).unwrap();
        assert_eq!(json, "\"svn\"");

        let deserialized: ScmType = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ScmType::Svn);
    }
}
