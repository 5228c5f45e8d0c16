use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{Attributes, SecretBackend, StoredItem};
use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;

#[derive(Default)]
struct Inner {
    items: Mutex<Vec<(StoredItem, String)>>,
    locked: AtomicBool,
}

/// Process-local secret collection.
///
/// Clones share the same items, so a second `SecretStorage` opened over a
/// clone sees what the first one wrote.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection that reports itself locked and refuses to unlock.
    pub fn locked() -> Self {
        let backend = Self::new();
        backend.inner.locked.store(true, Ordering::SeqCst);
        backend
    }

    pub fn set_locked(&self, locked: bool) {
        self.inner.locked.store(locked, Ordering::SeqCst);
    }

    /// Number of stored items, facts included.
    pub fn len(&self) -> usize {
        self.items().map(|items| items.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn items(&self) -> SyncReposResult<MutexGuard<'_, Vec<(StoredItem, String)>>> {
        self.inner
            .items
            .lock()
            .map_err(|_| SyncError::store_error("in-memory secret collection is poisoned"))
    }
}

impl SecretBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::SeqCst)
    }

    fn search_items(&self, query: &Attributes) -> SyncReposResult<Vec<StoredItem>> {
        Ok(self
            .items()?
            .iter()
            .filter(|(item, _)| item.matches(query))
            .map(|(item, _)| item.clone())
            .collect())
    }

    fn get_secret(&self, item: &StoredItem) -> SyncReposResult<SecretString> {
        self.items()?
            .iter()
            .find(|(stored, _)| stored.attributes == item.attributes)
            .map(|(_, secret)| SecretString::from(secret.clone()))
            .ok_or_else(|| SyncError::not_found(item.label.clone()))
    }

    fn create_item(
        &self,
        label: &str,
        attributes: &Attributes,
        secret: &SecretString,
        replace: bool,
    ) -> SyncReposResult<()> {
        let mut items = self.items()?;
        let value = secret.expose_secret().to_string();
        match items
            .iter_mut()
            .find(|(stored, _)| &stored.attributes == attributes)
        {
            Some(_) if !replace => Err(SyncError::store_error(format!(
                "an item with the same attributes as '{}' already exists",
                label
            ))),
            Some(existing) => {
                *existing = (StoredItem::new(label, attributes.clone()), value);
                Ok(())
            }
            None => {
                items.push((StoredItem::new(label, attributes.clone()), value));
                Ok(())
            }
        }
    }

    fn delete_item(&self, item: &StoredItem) -> SyncReposResult<()> {
        let mut items = self.items()?;
        let before = items.len();
        items.retain(|(stored, _)| stored.attributes != item.attributes);
        if items.len() == before {
            return Err(SyncError::not_found(item.label.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_search_is_superset_match() {
        let backend = MemoryBackend::new();
        let secret = SecretString::from("x".to_string());
        backend
            .create_item("a", &attrs(&[("server", "a"), ("object", "/r")]), &secret, true)
            .unwrap();
        backend
            .create_item("b", &attrs(&[("server", "a")]), &secret, true)
            .unwrap();

        assert_eq!(backend.search_items(&attrs(&[("server", "a")])).unwrap().len(), 2);
        assert_eq!(
            backend
                .search_items(&attrs(&[("object", "/r")]))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_replace_and_reject() {
        let backend = MemoryBackend::new();
        let key = attrs(&[("server", "a")]);
        backend
            .create_item("first", &key, &SecretString::from("1".to_string()), true)
            .unwrap();
        backend
            .create_item("second", &key, &SecretString::from("2".to_string()), true)
            .unwrap();
        assert_eq!(backend.len(), 1);

        let item = &backend.search_items(&key).unwrap()[0];
        assert_eq!(item.label, "second");
        assert_eq!(backend.get_secret(item).unwrap().expose_secret(), "2");

        let result = backend.create_item("third", &key, &SecretString::from("3".to_string()), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_clones_share_items() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend
            .create_item("a", &attrs(&[("k", "v")]), &SecretString::from("s".to_string()), true)
            .unwrap();
        assert_eq!(other.len(), 1);

        let item = other.search_items(&attrs(&[("k", "v")])).unwrap().remove(0);
        other.delete_item(&item).unwrap();
        assert!(backend.is_empty());
        assert!(matches!(backend.delete_item(&item), Err(SyncError::NotFound { .. })));
    }

    #[test]
    fn test_locked_backend_does_not_unlock() {
        let backend = MemoryBackend::locked();
        assert!(backend.is_locked());
        assert!(!backend.unlock().unwrap());
    }
}
