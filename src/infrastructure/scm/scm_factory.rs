use super::git_scm::GitScm;
use super::scm_interface::ScmOperations;
use super::svn_scm::SvnScm;
use crate::domain::value_objects::scm_type::ScmType;
use crate::infrastructure::process::CommandRunner;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for creating SCM implementation instances
pub struct ScmFactory;

impl ScmFactory {
    /// Create an SCM operations instance for the given SCM type
    pub fn create_scm(scm_type: ScmType, runner: Arc<dyn CommandRunner>) -> Arc<dyn ScmOperations> {
        match scm_type {
            ScmType::Git => Arc::new(GitScm::new(runner)),
            ScmType::Svn => Arc::new(SvnScm::new(runner)),
        }
    }

    /// One instance per supported SCM, sharing `runner`
    pub fn create_all(runner: Arc<dyn CommandRunner>) -> HashMap<ScmType, Arc<dyn ScmOperations>> {
        ScmType::ALL
            .iter()
            .map(|kind| (*kind, Self::create_scm(*kind, runner.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::process::MockCommandRunner;

    #[test]
    fn test_create_scm_instances() {
        let runner: Arc<dyn CommandRunner> = Arc::new(MockCommandRunner::new());
        assert_eq!(ScmFactory::create_scm(ScmType::Git, runner.clone()).scm_type(), ScmType::Git);
        assert_eq!(ScmFactory::create_scm(ScmType::Svn, runner.clone()).scm_type(), ScmType::Svn);
        assert_eq!(ScmFactory::create_all(runner).len(), 2);
    }
}
