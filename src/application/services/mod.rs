pub mod auth_checker;
pub mod credential_prompt;
pub mod updater;

pub use auth_checker::AuthChecker;
pub use credential_prompt::{ConsolePrompter, CredentialPrompter, PromptAnswer};
pub use updater::Updater;
