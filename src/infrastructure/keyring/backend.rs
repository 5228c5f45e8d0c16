use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::result::SyncReposResult;

/// Attribute map addressing a stored item. Ordered so that the serialized
/// form of a map is canonical.
pub type Attributes = BTreeMap<String, String>;

/// Public half of a stored item. The secret is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub label: String,
    pub attributes: Attributes,
}

impl StoredItem {
    pub fn new(label: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            label: label.into(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether every attribute of `query` is present with the same value.
    pub fn matches(&self, query: &Attributes) -> bool {
        query
            .iter()
            .all(|(key, value)| self.attributes.get(key) == Some(value))
    }
}

/// An attribute-addressed secret collection.
///
/// Items are identified by their full attribute map: creating an item whose
/// attributes equal an existing one's either replaces it or is rejected.
pub trait SecretBackend: Send + Sync {
    /// Human readable collection name, used in error messages.
    fn name(&self) -> &str;

    fn is_locked(&self) -> bool;

    /// Ask the collection to unlock. Returns whether it is unlocked afterwards.
    fn unlock(&self) -> SyncReposResult<bool> {
        Ok(!self.is_locked())
    }

    /// Every item carrying all attributes of `query` (superset match).
    fn search_items(&self, query: &Attributes) -> SyncReposResult<Vec<StoredItem>>;

    fn get_secret(&self, item: &StoredItem) -> SyncReposResult<SecretString>;

    fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &SecretString,
        replace: bool,
    ) -> SyncReposResult<()>;

    fn delete_item(&self, item: &StoredItem) -> SyncReposResult<()>;
}
