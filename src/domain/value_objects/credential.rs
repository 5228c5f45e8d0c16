use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;

/// A username and password pair for one identity.
///
/// The password never shows up in `Debug` output.
pub struct Credential {
    username: String,
    password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn from_secret(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Build an optional credential from optional halves.
    ///
    /// Both or neither must be given; anything else is a caller bug.
    pub fn from_parts(
        username: Option<String>,
        password: Option<SecretString>,
    ) -> SyncReposResult<Option<Self>> {
        match (username, password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some(Self { username, password })),
            (Some(_), None) => Err(SyncError::invalid_argument(
                "password",
                "a username was given without a password",
            )),
            (None, Some(_)) => Err(SyncError::invalid_argument(
                "username",
                "a password was given without a username",
            )),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Borrow the password in clear text. Callers must only hand it to a
    /// process stdin, the relay's stdout or the secure store.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.username.clone(), self.expose_password().to_owned())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
