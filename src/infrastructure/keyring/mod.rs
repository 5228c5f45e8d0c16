pub mod backend;
pub mod memory_backend;
pub mod os_backend;
pub mod secret_storage;

pub use backend::{Attributes, SecretBackend, StoredItem};
pub use memory_backend::MemoryBackend;
pub use os_backend::KeyringBackend;
pub use secret_storage::SecretStorage;
