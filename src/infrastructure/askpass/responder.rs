use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use super::{
    ENV_MARKER, ENV_OBJECT, ENV_PORT, ENV_PROTOCOL, ENV_SERVER, ENV_TEMPORARY_CREDENTIAL, ENV_USER,
    INVALID_TOKEN, MARKER_PASSWORD, MARKER_USERNAME,
};
use crate::common::error::SyncError;
use crate::common::result::{OptionExt, SyncReposResult};
use crate::domain::value_objects::Identity;
use crate::infrastructure::keyring::SecretStorage;

/// What the parent asked the helper to hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub identity: Identity,
    pub marker: PathBuf,
    pub username: Option<String>,
    pub temporary_credential: bool,
    /// Prompt text the calling tool passed as the first argument.
    pub prompt: Option<String>,
}

impl RelayRequest {
    /// Read the request from environment variables. Every variable written
    /// by [`super::RelaySession`] must be present; the object may be empty.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> SyncReposResult<Self> {
        let protocol = var(ENV_PROTOCOL).ok_or_bad_invocation(ENV_PROTOCOL)?;
        let server = var(ENV_SERVER).ok_or_bad_invocation(ENV_SERVER)?;
        let port = var(ENV_PORT)
            .ok_or_bad_invocation(ENV_PORT)?
            .trim()
            .parse::<u16>()
            .map_err(|_| SyncError::bad_relay_invocation(ENV_PORT))?;
        let object = var(ENV_OBJECT).ok_or_bad_invocation(ENV_OBJECT)?;
        let marker = var(ENV_MARKER).ok_or_bad_invocation(ENV_MARKER)?;

        Ok(Self {
            identity: Identity::new(protocol, server, port, object),
            marker: PathBuf::from(marker),
            username: var(ENV_USER).filter(|user| !user.is_empty()),
            temporary_credential: var(ENV_TEMPORARY_CREDENTIAL).is_some_and(|v| v == "1"),
            prompt: None,
        })
    }

    pub fn from_env() -> SyncReposResult<Self> {
        Ok(Self::from_vars(|name| std::env::var(name).ok())?.with_prompt(std::env::args().nth(1)))
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Git skips the username prompt when the URL already names a user.
    fn asks_for_password(&self) -> bool {
        self.prompt
            .as_deref()
            .is_some_and(|prompt| prompt.trim_start().starts_with("Password"))
    }

    /// Only synthetic identities are ever forgotten by the helper.
    fn forgets_after_password(&self) -> bool {
        self.temporary_credential && self.identity.is_temporary()
    }
}

/// Answer one prompt of the handshake on `out`.
///
/// The marker decides the step: `U` prints the username and moves on to
/// `P`; `P` prints the password and deletes the marker. A password prompt
/// met on the `U` step is answered as `P`. When nothing can be
/// handed out the literal `invalid` is printed instead, so the calling tool
/// sees an ordinary authentication failure.
pub fn respond(
    request: &RelayRequest,
    storage: &SecretStorage,
    out: &mut impl Write,
) -> SyncReposResult<()> {
    let mut step = match fs::read_to_string(&request.marker) {
        Ok(content) => content.trim().to_string(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            write!(out, "{}", INVALID_TOKEN)?;
            return Ok(out.flush()?);
        }
        Err(e) => return Err(e.into()),
    };

    if step == MARKER_USERNAME && request.asks_for_password() {
        step = MARKER_PASSWORD.to_string();
    }

    let lookup = storage.get_credentials(&request.identity)?;
    let credential = lookup.select(request.username.as_deref());

    match step.as_str() {
        MARKER_USERNAME => {
            match credential {
                Some(credential) => write!(out, "{}", credential.username())?,
                None => write!(out, "{}", INVALID_TOKEN)?,
            }
            fs::write(&request.marker, MARKER_PASSWORD)?;
        }
        MARKER_PASSWORD => {
            match credential {
                Some(credential) => write!(out, "{}", credential.expose_password())?,
                None => write!(out, "{}", INVALID_TOKEN)?,
            }
            fs::write(&request.marker, "")?;
            fs::remove_file(&request.marker)?;

            if request.forgets_after_password() {
                storage.forget_identity(&request.identity)?;
            }
        }
        _ => write!(out, "{}", INVALID_TOKEN)?,
    }

    Ok(out.flush()?)
}

/// Entry point of the helper process. Returns the exit code.
///
/// Nothing but the requested value is written to stdout.
pub fn run_responder() -> i32 {
    let request = match RelayRequest::from_env() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("ERROR! {}", e);
            return 1;
        }
    };

    let storage = match SecretStorage::open_default() {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("ERROR! {}", e);
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match respond(&request, &storage, &mut out) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("ERROR! {}", e);
            1
        }
    }
}
