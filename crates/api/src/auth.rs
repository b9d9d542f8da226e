//! Verification of identity-provider tokens.
//!
//! The provider issues HS256 JWTs; this module only checks them and turns
//! the claims into an [`Identity`]. Issuance, refresh and passwords live
//! with the provider.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use pollbox_common::{AppError, AppResult, config::AuthConfig};
use pollbox_core::{Identity, Role};
use serde::{Deserialize, Serialize};

/// Claims read from a provider token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity ID.
    pub sub: String,
    /// Role claim; absent means member.
    #[serde(default)]
    pub role: Role,
    /// Expiry (seconds since the epoch).
    pub exp: u64,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Checks bearer tokens against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier from the `[auth]` configuration section.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and return the identity it asserts.
    pub fn verify(&self, token: &str) -> AppResult<Identity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthenticated
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        Ok(Identity {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}
