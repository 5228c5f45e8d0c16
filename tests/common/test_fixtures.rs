//! Test fixtures
//!
//! Directory trees of working copies and in-memory secure stores.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use sync_repos::application::use_cases::{SyncRepositoriesConfig, SyncRepositoriesUseCase};
use sync_repos::domain::value_objects::{Identity, ScmType};
use sync_repos::infrastructure::keyring::{MemoryBackend, SecretStorage};
use sync_repos::infrastructure::scm::ScmOperations;
use tempfile::TempDir;

use super::fake_services::{FakeScm, ScriptedPrompter};

/// Create `<root>/<name>/<metadata dir>` for each working copy.
pub fn working_copies(entries: &[(&str, ScmType)]) -> TempDir {
    let root = TempDir::new().expect("Failed to create temp dir");
    for (name, kind) in entries {
        std::fs::create_dir_all(root.path().join(name).join(kind.metadata_dir()))
            .expect("Failed to create working copy");
    }
    root
}

/// A fresh, unlocked in-memory store.
pub fn memory_storage() -> SecretStorage {
    SecretStorage::open(Arc::new(MemoryBackend::new())).expect("memory store opens")
}

/// Wire a use case over the fake drivers.
pub fn use_case(
    config: SyncRepositoriesConfig,
    storage: &SecretStorage,
    scms: &[Arc<FakeScm>],
    prompter: &ScriptedPrompter,
) -> SyncRepositoriesUseCase {
    let drivers: HashMap<ScmType, Arc<dyn ScmOperations>> = scms
        .iter()
        .map(|scm| (scm.scm_type(), scm.clone() as Arc<dyn ScmOperations>))
        .collect();
    SyncRepositoriesUseCase::new(config, storage.clone(), drivers, Box::new(prompter.clone()))
}

/// Config rooted at `root`, attended, one job.
pub fn config(root: &Path) -> SyncRepositoriesConfig {
    SyncRepositoriesConfig::new(root)
}

/// Identity of a Git https remote without an explicit port.
pub fn git_https_identity(server: &str, object: &str) -> Identity {
    Identity::new("git-https", server, 0, object)
}
