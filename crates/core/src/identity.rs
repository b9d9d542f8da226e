//! Caller identity as asserted by the identity provider.

use serde::{Deserialize, Serialize};

/// Role claim carried by an identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    #[default]
    Member,
    /// May manage any poll.
    Admin,
}

/// An authenticated caller.
///
/// Anonymous callers are represented by the absence of an identity
/// (`Option<&Identity>`), never by a sentinel value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque, provider-assigned identifier.
    pub id: String,
    /// Role claim.
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    /// Identity with the member role.
    pub fn member(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Member,
        }
    }

    /// Identity with the admin role.
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// Whether this identity carries the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_deserializes_lowercase() {
        let identity: Identity = serde_json::from_str(r#"{"id":"u1","role":"admin"}"#).unwrap();
        assert!(identity.is_admin());
    }

    #[test]
    fn test_role_defaults_to_member() {
        let identity: Identity = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert_eq!(identity.role, Role::Member);
        assert_eq!(identity.id, "u1");
    }
}
