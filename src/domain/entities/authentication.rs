use std::fmt;

use crate::domain::value_objects::Credential;

/// What the secure store knows about whether an identity needs authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFact {
    /// Nothing recorded yet.
    Unknown,
    NotRequired,
    Required,
}

impl AuthFact {
    /// Payload stored in a fact item.
    pub fn as_payload(&self) -> Option<&'static str> {
        match self {
            AuthFact::Unknown => None,
            AuthFact::NotRequired => Some("False"),
            AuthFact::Required => Some("True"),
        }
    }

    /// Read a fact item payload back. Anything but `"False"` counts as
    /// requiring authentication.
    pub fn from_payload(payload: &str) -> Self {
        if payload.trim() == "False" {
            AuthFact::NotRequired
        } else {
            AuthFact::Required
        }
    }
}

impl fmt::Display for AuthFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFact::Unknown => write!(f, "unknown"),
            AuthFact::NotRequired => write!(f, "not required"),
            AuthFact::Required => write!(f, "required"),
        }
    }
}

/// Result of looking up the credentials of an identity.
#[derive(Debug, Clone)]
pub enum CredentialLookup {
    /// No fact recorded for the identity.
    Unknown,
    /// The server is known not to need authentication.
    NotRequired,
    /// The server needs authentication; the list may be empty when nothing
    /// has been stored yet.
    Required(Vec<Credential>),
}

impl CredentialLookup {
    /// Stored credentials, empty unless authentication is required.
    pub fn credentials(&self) -> &[Credential] {
        match self {
            CredentialLookup::Required(credentials) => credentials,
            _ => &[],
        }
    }

    /// Find the credential of `username`, or the first one when no user is named.
    pub fn select(&self, username: Option<&str>) -> Option<&Credential> {
        let credentials = self.credentials();
        match username {
            Some(username) if !username.is_empty() => {
                credentials.iter().find(|c| c.username() == username)
            }
            _ => credentials.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_payload_round_trip() {
        assert_eq!(AuthFact::Required.as_payload(), Some("True"));
        assert_eq!(AuthFact::NotRequired.as_payload(), Some("False"));
        assert_eq!(AuthFact::Unknown.as_payload(), None);
        assert_eq!(AuthFact::from_payload("False"), AuthFact::NotRequired);
        assert_eq!(AuthFact::from_payload("True"), AuthFact::Required);
    }

    #[test]
    fn test_select_credential() {
        let lookup = CredentialLookup::Required(vec![
            Credential::new("alice", "a"),
            Credential::new("bob", "b"),
        ]);
        assert_eq!(lookup.select(None).unwrap().username(), "alice");
        assert_eq!(lookup.select(Some("")).unwrap().username(), "alice");
        assert_eq!(lookup.select(Some("bob")).unwrap().username(), "bob");
        assert!(lookup.select(Some("carol")).is_none());

        assert!(CredentialLookup::NotRequired.select(None).is_none());
        assert!(CredentialLookup::Required(vec![]).select(None).is_none());
    }
}
