use console::{style, Term};
use secrecy::SecretString;

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::value_objects::Credential;

/// What the user answered when asked for a remote's credentials.
#[derive(Debug)]
pub enum PromptAnswer {
    /// The user left the username empty: the server needs no authentication.
    NoAuthentication,
    Credential(Credential),
}

/// Asks the user for credentials. Only used when running attended.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialPrompter: Send {
    /// Explain where entered credentials end up.
    fn show_security_notice(&mut self);

    fn ask(&mut self, url: &str) -> SyncReposResult<PromptAnswer>;
}

const SECURITY_NOTICE: &[&str] = &[
    "Usernames and passwords entered below are saved into your platform keyring.",
    "The keyring is encrypted and only readable by your user account. It has to be",
    "unlocked once per session, which usually happens when you log in.",
    "Saved details are reused on later runs and will not be asked for again.",
];

/// Prompts on the controlling terminal; the password is read without echo.
pub struct ConsolePrompter {
    term: Term,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn io_error(error: std::io::Error) -> SyncError {
        SyncError::filesystem_error_with_source("Failed to read from the terminal", None, error)
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialPrompter for ConsolePrompter {
    fn show_security_notice(&mut self) {
        let rule = style("--------- SECURITY INFORMATION ----------").yellow().bold();
        let _ = self.term.write_line(&rule.to_string());
        for line in SECURITY_NOTICE {
            let _ = self.term.write_line(line);
        }
        let _ = self.term.write_line(&rule.to_string());
    }

    fn ask(&mut self, url: &str) -> SyncReposResult<PromptAnswer> {
        let term = &self.term;
        term.write_line(&format!("Entering authentication details for '{}'...", url))
            .map_err(Self::io_error)?;
        term.write_line("Leave the username EMPTY if the server requires NO authentication.")
            .map_err(Self::io_error)?;

        term.write_str("Username (empty if no authentication): ")
            .map_err(Self::io_error)?;
        let username = term.read_line().map_err(Self::io_error)?;
        let username = username.trim();
        if username.is_empty() {
            term.write_line("No authentication needed.").map_err(Self::io_error)?;
            return Ok(PromptAnswer::NoAuthentication);
        }

        loop {
            term.write_str(&format!("Password for user '{}': ", username))
                .map_err(Self::io_error)?;
            let password = term.read_secure_line().map_err(Self::io_error)?;
            if password.trim().is_empty() {
                term.write_line(&style("ERROR: Empty password given.").red().to_string())
                    .map_err(Self::io_error)?;
                continue;
            }
            return Ok(PromptAnswer::Credential(Credential::from_secret(
                username,
                SecretString::from(password),
            )));
        }
    }
}
