use ::keyring::Entry;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::debug;

use super::backend::{Attributes, SecretBackend, StoredItem};
use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;

/// Service name all entries of this tool are filed under.
pub const DEFAULT_SERVICE: &str = "sync-repos";

const DIRECTORY_USER: &str = "index";

/// Largest piece of an index written to one entry, in UTF-8 bytes. Twice
/// this bound stays under the 2560 byte UTF-16 blob limit of the Windows
/// credential manager.
const CHUNK_BYTES: usize = 1024;

/// Flat `user -> password` entries of one keyring service.
pub trait EntryStore: Send + Sync {
    fn get(&self, user: &str) -> Result<String, ::keyring::Error>;

    fn set(&self, user: &str, password: &str) -> Result<(), ::keyring::Error>;

    fn delete(&self, user: &str) -> Result<(), ::keyring::Error>;
}

/// Entries of the platform keyring.
pub struct PlatformEntries {
    service: String,
}

impl PlatformEntries {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl EntryStore for PlatformEntries {
    fn get(&self, user: &str) -> Result<String, ::keyring::Error> {
        Entry::new(&self.service, user)?.get_password()
    }

    fn set(&self, user: &str, password: &str) -> Result<(), ::keyring::Error> {
        Entry::new(&self.service, user)?.set_password(password)
    }

    fn delete(&self, user: &str) -> Result<(), ::keyring::Error> {
        Entry::new(&self.service, user)?.delete_credential()
    }
}

/// Index shard holding the items of one `(protocol, server, port)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct ShardKey {
    protocol: String,
    server: String,
    port: String,
}

impl ShardKey {
    /// The single shard a query can match, if the query names one.
    fn of_query(query: &Attributes) -> Option<Self> {
        Some(Self {
            protocol: query.get("protocol")?.clone(),
            server: query.get("server")?.clone(),
            port: query.get("port")?.clone(),
        })
    }

    fn of_item(attributes: &Attributes) -> Self {
        let value = |name: &str| attributes.get(name).cloned().unwrap_or_default();
        Self {
            protocol: value("protocol"),
            server: value("server"),
            port: value("port"),
        }
    }

    fn user(&self) -> String {
        format!("index/{}/{}/{}", self.protocol, self.server, self.port)
    }
}

fn chunk_user(key: &str, n: usize) -> String {
    if n == 0 {
        key.to_string()
    } else {
        format!("{}#{}", key, n)
    }
}

fn split_chunks(value: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let mut end = rest.len().min(CHUNK_BYTES);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Secret collection on top of the platform keyring.
///
/// The platform keyring only knows `(service, user)` pairs. Each secret is
/// filed under a user name equal to the canonical JSON form of its
/// attributes. Items are indexed per `(protocol, server, port)` so a lookup
/// reads one shard, and a directory entry lists the shards. Index values
/// are split over as many entries as needed to respect platform size
/// limits. The index never holds secrets.
pub struct KeyringBackend {
    service: String,
    entries: Box<dyn EntryStore>,
    index_lock: Mutex<()>,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let entries = PlatformEntries::new(service.clone());
        Self::with_entries(service, entries)
    }

    pub fn with_entries(service: impl Into<String>, entries: impl EntryStore + 'static) -> Self {
        Self {
            service: service.into(),
            entries: Box::new(entries),
            index_lock: Mutex::new(()),
        }
    }

    fn secret_user(attributes: &Attributes) -> SyncReposResult<String> {
        Ok(serde_json::to_string(attributes)?)
    }

    fn map_error(&self, action: &str, error: ::keyring::Error) -> SyncError {
        match error {
            ::keyring::Error::NoStorageAccess(_) => SyncError::store_locked(self.service.clone()),
            other => SyncError::store_error_with_source(
                format!("Failed to {} in '{}'", action, self.service),
                other,
            ),
        }
    }

    fn read_value(&self, key: &str) -> SyncReposResult<Option<String>> {
        let mut value = String::new();
        for n in 0.. {
            match self.entries.get(&chunk_user(key, n)) {
                Ok(chunk) => value.push_str(&chunk),
                Err(::keyring::Error::NoEntry) if n == 0 => return Ok(None),
                Err(::keyring::Error::NoEntry) => break,
                Err(e) => return Err(self.map_error("read the item index", e)),
            }
        }
        Ok(Some(value))
    }

    /// Write `value` in chunks and drop chunks left over from a longer one.
    /// An empty value removes the key.
    fn write_value(&self, key: &str, value: &str) -> SyncReposResult<()> {
        let chunks = split_chunks(value);
        for (n, chunk) in chunks.iter().enumerate() {
            self.entries
                .set(&chunk_user(key, n), chunk)
                .map_err(|e| self.map_error("write the item index", e))?;
        }
        for n in chunks.len().. {
            match self.entries.delete(&chunk_user(key, n)) {
                Ok(()) => {}
                Err(::keyring::Error::NoEntry) => break,
                Err(e) => return Err(self.map_error("clear the item index", e)),
            }
        }
        Ok(())
    }

    fn read_directory(&self) -> SyncReposResult<BTreeSet<ShardKey>> {
        match self.read_value(DIRECTORY_USER)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(BTreeSet::new()),
        }
    }

    fn write_directory(&self, directory: &BTreeSet<ShardKey>) -> SyncReposResult<()> {
        let json = if directory.is_empty() {
            String::new()
        } else {
            serde_json::to_string(directory)?
        };
        self.write_value(DIRECTORY_USER, &json)
    }

    fn read_shard(&self, key: &ShardKey) -> SyncReposResult<Vec<StoredItem>> {
        match self.read_value(&key.user())? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Store a shard, keeping the directory in step when the shard appears
    /// or becomes empty.
    fn write_shard(&self, key: &ShardKey, items: &[StoredItem], was_empty: bool) -> SyncReposResult<()> {
        if items.is_empty() {
            self.write_value(&key.user(), "")?;
            if !was_empty {
                let mut directory = self.read_directory()?;
                directory.remove(key);
                self.write_directory(&directory)?;
            }
            return Ok(());
        }

        self.write_value(&key.user(), &serde_json::to_string(items)?)?;
        if was_empty {
            let mut directory = self.read_directory()?;
            if directory.insert(key.clone()) {
                self.write_directory(&directory)?;
            }
        }
        Ok(())
    }

    fn with_index<T>(&self, f: impl FnOnce() -> SyncReposResult<T>) -> SyncReposResult<T> {
        let _guard = self
            .index_lock
            .lock()
            .map_err(|_| SyncError::store_error("keyring index lock is poisoned"))?;
        f()
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl SecretBackend for KeyringBackend {
    fn name(&self) -> &str {
        &self.service
    }

    fn is_locked(&self) -> bool {
        matches!(self.read_directory(), Err(SyncError::StoreLocked { .. }))
    }

    fn search_items(&self, query: &Attributes) -> SyncReposResult<Vec<StoredItem>> {
        self.with_index(|| {
            let shards = match ShardKey::of_query(query) {
                Some(key) => vec![key],
                None => self.read_directory()?.into_iter().collect(),
            };
            let mut found = Vec::new();
            for key in &shards {
                found.extend(
                    self.read_shard(key)?
                        .into_iter()
                        .filter(|item| item.matches(query)),
                );
            }
            Ok(found)
        })
    }

    fn get_secret(&self, item: &StoredItem) -> SyncReposResult<SecretString> {
        match self.entries.get(&Self::secret_user(&item.attributes)?) {
            Ok(secret) => Ok(SecretString::from(secret)),
            Err(::keyring::Error::NoEntry) => Err(SyncError::not_found(item.label.clone())),
            Err(e) => Err(self.map_error("read a secret", e)),
        }
    }

    fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &SecretString,
        replace: bool,
    ) -> SyncReposResult<()> {
        self.with_index(|| {
            let key = ShardKey::of_item(attributes);
            let mut shard = self.read_shard(&key)?;
            let was_empty = shard.is_empty();
            let existing = shard.iter().position(|item| &item.attributes == attributes);
            if existing.is_some() && !replace {
                return Err(SyncError::store_error(format!(
                    "an item with the same attributes as '{}' already exists",
                    label
                )));
            }

            self.entries
                .set(&Self::secret_user(attributes)?, secret.expose_secret())
                .map_err(|e| self.map_error("store a secret", e))?;

            let item = StoredItem::new(label, attributes.clone());
            match existing {
                Some(position) => shard[position] = item,
                None => shard.push(item),
            }
            debug!("Stored keyring item '{}'", label);
            self.write_shard(&key, &shard, was_empty)
        })
    }

    fn delete_item(&self, item: &StoredItem) -> SyncReposResult<()> {
        self.with_index(|| {
            let key = ShardKey::of_item(&item.attributes);
            let mut shard = self.read_shard(&key)?;
            let before = shard.len();
            shard.retain(|stored| stored.attributes != item.attributes);
            if shard.len() == before {
                return Err(SyncError::not_found(item.label.clone()));
            }

            match self.entries.delete(&Self::secret_user(&item.attributes)?) {
                Ok(()) | Err(::keyring::Error::NoEntry) => {}
                Err(e) => return Err(self.map_error("delete a secret", e)),
            }
            debug!("Deleted keyring item '{}'", item.label);
            self.write_shard(&key, &shard, false)
        })
    }
}
