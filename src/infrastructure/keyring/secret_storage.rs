use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::{Attributes, SecretBackend, StoredItem};
use super::os_backend::KeyringBackend;
use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::entities::{AuthFact, CredentialLookup};
use crate::domain::value_objects::{Credential, Identity};

/// Value of the `application` attribute on every item this tool writes.
pub const APPLICATION: &str = "whisperity/sync-repositories";

const FACT_SCHEMA: &str = "org.gnome.keyring.Note";
const CREDENTIAL_SCHEMA: &str = "org.gnome.keyring.NetworkPassword";
const CREDENTIAL_AUTHTYPE: &str = "username-password";

/// Authentication knowledge kept in a secret collection.
///
/// Every lookup is an exact match on `(protocol, server, port, object)`:
/// an identity without an object never sees items that carry one.
#[derive(Clone)]
pub struct SecretStorage {
    backend: Arc<dyn SecretBackend>,
}

impl SecretStorage {
    /// Open a storage over `backend`. A locked backend is refused.
    pub fn open(backend: Arc<dyn SecretBackend>) -> SyncReposResult<Self> {
        if backend.is_locked() {
            return Err(SyncError::store_locked(backend.name()));
        }
        Ok(Self { backend })
    }

    /// Open the platform keyring, asking it to unlock once if needed.
    pub fn open_default() -> SyncReposResult<Self> {
        let backend: Arc<dyn SecretBackend> = Arc::new(KeyringBackend::default());
        if backend.is_locked() {
            info!(
                "The keyring '{}' used for storing passwords is locked, trying to unlock it",
                backend.name()
            );
            if !backend.unlock()? {
                return Err(SyncError::store_locked(backend.name()));
            }
        }
        Self::open(backend)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn base_attributes(schema: &str, identity: &Identity) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("xdg:schema".into(), schema.into());
        attributes.insert("application".into(), APPLICATION.into());
        attributes.insert("protocol".into(), identity.protocol().into());
        attributes.insert("server".into(), identity.server().into());
        attributes.insert("port".into(), identity.port().to_string());
        if let Some(object) = identity.object_name() {
            attributes.insert("object".into(), object.into());
        }
        attributes
    }

    fn fact_attributes(identity: &Identity) -> Attributes {
        Self::base_attributes(FACT_SCHEMA, identity)
    }

    fn credential_attributes(identity: &Identity) -> Attributes {
        let mut attributes = Self::base_attributes(CREDENTIAL_SCHEMA, identity);
        attributes.insert("authtype".into(), CREDENTIAL_AUTHTYPE.into());
        attributes
    }

    /// Search with superset semantics, then drop items whose `object`
    /// differs from the identity's.
    fn search_exact(&self, query: &Attributes, identity: &Identity) -> SyncReposResult<Vec<StoredItem>> {
        Ok(self
            .backend
            .search_items(query)?
            .into_iter()
            .filter(|item| item.attribute("object") == identity.object_name())
            .collect())
    }

    /// The authentication fact recorded for `identity`.
    pub fn is_requiring_authentication(&self, identity: &Identity) -> SyncReposResult<AuthFact> {
        let facts = self.search_exact(&Self::fact_attributes(identity), identity)?;
        match facts.first() {
            None => Ok(AuthFact::Unknown),
            Some(item) => {
                let payload = self.backend.get_secret(item)?;
                Ok(AuthFact::from_payload(payload.expose_secret()))
            }
        }
    }

    /// Everything known about `identity`: no fact, no authentication needed,
    /// or the stored credentials (possibly none) of an authenticating server.
    pub fn get_credentials(&self, identity: &Identity) -> SyncReposResult<CredentialLookup> {
        match self.is_requiring_authentication(identity)? {
            AuthFact::Unknown => Ok(CredentialLookup::Unknown),
            AuthFact::NotRequired => Ok(CredentialLookup::NotRequired),
            AuthFact::Required => {
                let items = self.search_exact(&Self::credential_attributes(identity), identity)?;
                let mut credentials = Vec::with_capacity(items.len());
                for item in &items {
                    let Some(username) = item.attribute("user") else {
                        continue;
                    };
                    let password = self.backend.get_secret(item)?;
                    credentials.push(Credential::from_secret(username, password));
                }
                credentials.sort_by(|a, b| a.username().cmp(b.username()));
                Ok(CredentialLookup::Required(credentials))
            }
        }
    }

    /// Store or overwrite the credential of `username` and mark the identity
    /// as requiring authentication.
    pub fn set_credential(
        &self,
        identity: &Identity,
        username: &str,
        password: &SecretString,
    ) -> SyncReposResult<()> {
        let mut attributes = Self::credential_attributes(identity);
        attributes.insert("user".into(), username.into());
        let label = format!(
            "{} password for '{}' on '{}'",
            identity.protocol(),
            username,
            identity.server()
        );
        self.backend.create_item(&label, &attributes, password, true)?;
        debug!("Stored credential of '{}' for {}", username, identity);

        self.set_authenticated(identity)
    }

    /// Delete the credential of `username`. Fails with `NotFound` when no such
    /// credential is stored.
    pub fn delete_credential(&self, identity: &Identity, username: &str) -> SyncReposResult<()> {
        let mut query = Self::credential_attributes(identity);
        query.insert("user".into(), username.into());
        let items = self.search_exact(&query, identity)?;
        if items.is_empty() {
            return Err(SyncError::not_found(format!("{}:{}", identity, username)));
        }
        for item in &items {
            self.backend.delete_item(item)?;
        }
        Ok(())
    }

    /// Remove every credential and fact stored for any object on
    /// `(protocol, server, port)`.
    pub fn delete_server(&self, protocol: &str, server: &str, port: u16) -> SyncReposResult<()> {
        let server_wide = Identity::server_wide(protocol, server, port);
        let queries = [
            Self::credential_attributes(&server_wide),
            Self::fact_attributes(&server_wide),
        ];
        for query in &queries {
            for item in self.backend.search_items(query)? {
                self.backend.delete_item(&item)?;
            }
        }
        debug!("Forgot everything about {}", server_wide);
        Ok(())
    }

    /// Remove the fact and every credential of exactly this identity.
    pub fn forget_identity(&self, identity: &Identity) -> SyncReposResult<()> {
        let queries = [
            Self::credential_attributes(identity),
            Self::fact_attributes(identity),
        ];
        for query in &queries {
            for item in self.search_exact(query, identity)? {
                self.backend.delete_item(&item)?;
            }
        }
        Ok(())
    }

    pub fn set_authenticated(&self, identity: &Identity) -> SyncReposResult<()> {
        self.store_fact(identity, AuthFact::Required)
    }

    /// Record that `identity` needs no authentication. Stored credentials are
    /// left alone.
    pub fn set_unauthenticated(&self, identity: &Identity) -> SyncReposResult<()> {
        self.store_fact(identity, AuthFact::NotRequired)
    }

    fn store_fact(&self, identity: &Identity, fact: AuthFact) -> SyncReposResult<()> {
        let payload = fact
            .as_payload()
            .ok_or_else(|| SyncError::invalid_argument("fact", "cannot store an unknown fact"))?;
        let label = format!(
            "Is '{}:{}/{}' for '{}' authenticating?",
            identity.server(),
            identity.port(),
            identity.object(),
            identity.protocol()
        );
        self.backend.create_item(
            &label,
            &Self::fact_attributes(identity),
            &SecretString::from(payload.to_string()),
            true,
        )
    }
}
