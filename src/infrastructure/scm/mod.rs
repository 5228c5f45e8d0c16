//! SCM (Source Control Management) operations infrastructure
//!
//! This module provides a unified interface for Git and Subversion working
//! copies: reading their remotes, probing them and updating them.

pub mod scm_interface;
pub mod git_scm;
pub mod svn_scm;
pub mod scm_factory;

pub use scm_interface::{CredentialUse, RemoteAuth, ScmError, ScmOperations};
pub use scm_factory::ScmFactory;
