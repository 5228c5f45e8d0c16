//! Infrastructure layer modules
//!
//! This layer provides concrete implementations for external system interactions:
//! - SCM operations (Git, SVN)
//! - Secure credential storage (platform keyring)
//! - The askpass credential relay
//! - File system discovery of working copies
//! - Process execution

pub mod askpass;
pub mod filesystem;
pub mod keyring;
pub mod process;
pub mod scm;

// Re-export commonly used types
pub use filesystem::discovery::{discover_repositories, DiscoveredRepository};
pub use self::keyring::SecretStorage;
pub use process::{CommandRunner, TokioCommandRunner};
pub use scm::{ScmError, ScmFactory, ScmOperations};
