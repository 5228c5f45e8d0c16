//! Credential relay: the process re-invokes itself as `GIT_ASKPASS` and
//! answers the username and password prompts from the secure store.

pub mod responder;
pub mod session;

pub use responder::{respond, run_responder, RelayRequest};
pub use session::RelaySession;

pub const ENV_GIT_ASKPASS: &str = "GIT_ASKPASS";
pub const ENV_ACTIVATE: &str = "SR_ASKPASS";
pub const ENV_PROTOCOL: &str = "SR_ASKPASS_PROTOCOL";
pub const ENV_SERVER: &str = "SR_ASKPASS_SERVER";
pub const ENV_PORT: &str = "SR_ASKPASS_PORT";
pub const ENV_OBJECT: &str = "SR_ASKPASS_OBJECT";
pub const ENV_MARKER: &str = "SR_ASKPASS_TEMP";
pub const ENV_TEMPORARY_CREDENTIAL: &str = "SR_ASKPASS_TEMPORARY_CREDENTIAL";
pub const ENV_USER: &str = "SR_ASKPASS_USER";

pub const MARKER_USERNAME: &str = "U";
pub const MARKER_PASSWORD: &str = "P";

/// Printed when no credential can be handed out.
pub const INVALID_TOKEN: &str = "invalid";

/// Whether this process was started as the relay helper.
pub fn is_relay_invocation() -> bool {
    std::env::var(ENV_ACTIVATE).is_ok_and(|value| value == "1")
}
