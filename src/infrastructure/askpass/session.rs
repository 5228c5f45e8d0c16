use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{
    ENV_ACTIVATE, ENV_GIT_ASKPASS, ENV_MARKER, ENV_OBJECT, ENV_PORT, ENV_PROTOCOL, ENV_SERVER,
    ENV_TEMPORARY_CREDENTIAL, ENV_USER, MARKER_USERNAME,
};
use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::value_objects::{Credential, Identity};
use crate::infrastructure::keyring::SecretStorage;

/// One username/password handshake through a re-invoked helper.
///
/// Owns the marker file and, for candidate credentials, the temporary store
/// entry. Both are removed when the session is dropped, whether or not the
/// child ever asked for them.
pub struct RelaySession {
    marker: PathBuf,
    environment: BTreeMap<String, String>,
    temporary: Option<(SecretStorage, Identity)>,
}

impl RelaySession {
    /// Relay the stored credential of `identity`. `username` picks one of
    /// several stored credentials; without it the first is used.
    pub fn create(helper: &Path, identity: &Identity, username: Option<&str>) -> SyncReposResult<Self> {
        let marker = Self::create_marker()?;

        let mut environment = BTreeMap::new();
        environment.insert(ENV_GIT_ASKPASS.to_string(), helper.display().to_string());
        environment.insert(ENV_ACTIVATE.to_string(), "1".to_string());
        environment.insert(ENV_PROTOCOL.to_string(), identity.protocol().to_string());
        environment.insert(ENV_SERVER.to_string(), identity.server().to_string());
        environment.insert(ENV_PORT.to_string(), identity.port().to_string());
        environment.insert(ENV_OBJECT.to_string(), identity.object().to_string());
        environment.insert(ENV_MARKER.to_string(), marker.display().to_string());
        if let Some(username) = username {
            environment.insert(ENV_USER.to_string(), username.to_string());
        }

        Ok(Self {
            marker,
            environment,
            temporary: None,
        })
    }

    /// Relay a credential that is not stored yet. It is parked under the
    /// temporary twin of `identity` until the handshake completes or the
    /// session is dropped.
    pub fn create_with_credentials(
        helper: &Path,
        storage: &SecretStorage,
        credential: &Credential,
        identity: &Identity,
    ) -> SyncReposResult<Self> {
        let temporary = identity.temporary();
        storage.set_credential(&temporary, credential.username(), credential.password())?;

        let mut session = match Self::create(helper, &temporary, Some(credential.username())) {
            Ok(session) => session,
            Err(e) => {
                let _ = storage.forget_identity(&temporary);
                return Err(e);
            }
        };
        session
            .environment
            .insert(ENV_TEMPORARY_CREDENTIAL.to_string(), "1".to_string());
        session.temporary = Some((storage.clone(), temporary));
        Ok(session)
    }

    fn create_marker() -> SyncReposResult<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("sync-repos-askpass-")
            .tempfile()
            .map_err(|e| {
                SyncError::filesystem_error_with_source("Failed to create relay marker", None, e)
            })?;
        file.write_all(MARKER_USERNAME.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| {
            SyncError::filesystem_error_with_source("Failed to keep relay marker", None, e.error)
        })?;
        Ok(path)
    }

    /// Variables to add to the child's environment.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary.is_some()
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.marker) {
            Ok(()) => debug!("Removed unused relay marker {}", self.marker.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove relay marker {}: {}", self.marker.display(), e),
        }

        if let Some((storage, identity)) = self.temporary.take() {
            if let Err(e) = storage.forget_identity(&identity) {
                warn!("Failed to drop temporary credential {}: {}", identity, e);
            }
        }
    }
}
