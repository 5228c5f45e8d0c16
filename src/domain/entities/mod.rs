pub mod authentication;
pub mod repository;

pub use authentication::{AuthFact, CredentialLookup};
pub use repository::{Remote, Repository};
