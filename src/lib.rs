//! # sync-repos - keep a tree of working copies up to date
//!
//! `sync-repos` walks a directory tree, finds every Git and Subversion
//! working copy in it and updates each one from all of its remotes.
//! Whether a remote needs a username and password is found out once, with a
//! read-only probe, and remembered in the platform keyring together with the
//! credentials the user enters. Later runs need no interaction.
//!
//! ## Quick Start
//!
//! ```bash
//! # First run: answer the prompts for servers that need a password
//! sync-repos ~/src
//!
//! # From cron: never prompt, skip what cannot be done unattended
//! sync-repos --daemon --jobs 4 ~/src
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: remotes, identities, credentials and authentication facts
//! - [`application`]: the authentication checker, the updater and the run
//!   orchestration
//! - [`infrastructure`]: keyring storage, the askpass relay, SCM drivers,
//!   process execution and working copy discovery
//! - [`presentation`]: the command line interface
//! - [`common`]: error types shared by every layer
//!
//! ## Credential relay
//!
//! Git never receives a password on its command line. The binary is passed
//! as `GIT_ASKPASS` and, when started with `SR_ASKPASS=1`, answers Git's
//! username and password prompts from the keyring; see
//! [`infrastructure::askpass`].
//!
//! ## Using the Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sync_repos::application::services::ConsolePrompter;
//! use sync_repos::application::use_cases::{SyncRepositoriesConfig, SyncRepositoriesUseCase};
//! use sync_repos::infrastructure::{ScmFactory, SecretStorage, TokioCommandRunner};
//!
//! # async fn example() -> sync_repos::Result<()> {
//! let storage = SecretStorage::open_default()?;
//! let scms = ScmFactory::create_all(Arc::new(TokioCommandRunner::new()));
//! let config = SyncRepositoriesConfig::new("/home/me/src").with_daemon(true);
//!
//! let mut use_case =
//!     SyncRepositoriesUseCase::new(config, storage, scms, Box::new(ConsolePrompter::new()));
//! let report = use_case.execute().await?;
//! println!("{} remotes updated", report.updated.len());
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::SyncError;
pub use crate::common::result::SyncReposResult as Result;
