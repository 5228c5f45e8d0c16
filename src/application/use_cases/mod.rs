pub mod sync_repositories;

pub use sync_repositories::{
    RemoteTarget, SkipReason, SyncReport, SyncRepositoriesConfig, SyncRepositoriesUseCase,
};
