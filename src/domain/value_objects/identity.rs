use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to the object of a synthetic identity that holds a
/// credential only for the duration of one relay handshake.
pub const TEMPORARY_OBJECT_SUFFIX: &str = "__TEMP";

/// Protocol used by synthetic identities.
pub const TEMPORARY_PROTOCOL: &str = "temp";

/// Canonical key of every piece of stored authentication knowledge:
/// `(protocol, server, port, object)`.
///
/// `port == 0` means the URL did not name a port. An empty `object` means
/// "no sub-object", so `Identity::new(.., "")` and an identity built without
/// an object are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    protocol: String,
    server: String,
    port: u16,
    object: String,
}

impl Identity {
    pub fn new(
        protocol: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        object: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            server: server.into(),
            port,
            object: object.into(),
        }
    }

    /// Identity without a sub-object discriminator.
    pub fn server_wide(protocol: impl Into<String>, server: impl Into<String>, port: u16) -> Self {
        Self::new(protocol, server, port, String::new())
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// The object, or `None` when the identity carries no discriminator.
    pub fn object_name(&self) -> Option<&str> {
        if self.object.is_empty() {
            None
        } else {
            Some(&self.object)
        }
    }

    /// Same server, same port, no object: the key for a server-wide fact.
    pub fn without_object(&self) -> Self {
        Self::server_wide(self.protocol.clone(), self.server.clone(), self.port)
    }

    /// The synthetic identity under which a one-off credential is parked
    /// while it is being validated.
    pub fn temporary(&self) -> Self {
        Self::new(
            TEMPORARY_PROTOCOL,
            self.server.clone(),
            self.port,
            format!("{}{}", self.object, TEMPORARY_OBJECT_SUFFIX),
        )
    }

    pub fn is_temporary(&self) -> bool {
        self.protocol == TEMPORARY_PROTOCOL && self.object.ends_with(TEMPORARY_OBJECT_SUFFIX)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.protocol, self.server, self.port)?;
        if let Some(object) = self.object_name() {
            write!(f, ":{}", object)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_means_no_object() {
        let with_empty = Identity::new("git-https", "example.org", 0, "");
        let server_wide = Identity::server_wide("git-https", "example.org", 0);
        assert_eq!(with_empty, server_wide);
        assert_eq!(server_wide.object_name(), None);
    }

    #[test]
    fn test_all_fields_participate_in_equality() {
        let base = Identity::new("git-https", "example.org", 443, "/r.git");
        assert_ne!(base, Identity::new("svn-https", "example.org", 443, "/r.git"));
        assert_ne!(base, Identity::new("git-https", "example.com", 443, "/r.git"));
        assert_ne!(base, Identity::new("git-https", "example.org", 0, "/r.git"));
        assert_ne!(base, Identity::new("git-https", "example.org", 443, "/other.git"));
        assert_ne!(base, base.without_object());
    }

    #[test]
    fn test_temporary_identity() {
        let identity = Identity::new("git-https", "example.org", 443, "/r.git");
        let temporary = identity.temporary();
        assert_eq!(temporary.protocol(), "temp");
        assert_eq!(temporary.object(), "/r.git__TEMP");
        assert!(temporary.is_temporary());
        assert!(!identity.is_temporary());
    }

    #[test]
    fn test_display() {
        let identity = Identity::new("git-https", "example.org", 443, "/r.git");
        assert_eq!(identity.to_string(), "git-https:example.org:443:/r.git");
        assert_eq!(identity.without_object().to_string(), "git-https:example.org:443");
    }
}
