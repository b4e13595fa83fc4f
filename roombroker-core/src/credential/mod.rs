//! Bearer credential verification
//!
//! Credentials are compact HS256 JWTs signed with a secret shared by the
//! broker fleet. The caller's identity is the `userId` claim.

use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Identity extracted from a verified credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Why a credential was refused
///
/// The display text is what callers see, so it never carries the underlying
/// parse or signature error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid token")]
    InvalidToken,

    #[error("missing identity claim")]
    MissingIdentityClaim,
}

/// Claims read from a verified credential
///
/// Only `userId` is looked at. Registered claims such as `exp` are checked by
/// jsonwebtoken itself, so their shape never fails decoding here.
#[derive(Debug, Deserialize)]
struct VerifiedClaims {
    #[serde(rename = "userId", default)]
    user_id: Option<serde_json::Value>,
}

/// Claims written by `mint_credential`
#[derive(Debug, Serialize)]
struct MintedClaims<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Verifies credentials against the fleet secret
pub struct CredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialValidator {
    /// Create a validator that accepts any correctly signed credential
    pub fn new(secret: &SecretString) -> Self {
        Self::with_expiry(secret, false)
    }

    /// Create a validator, optionally requiring an unexpired `exp` claim
    pub fn with_expiry(secret: &SecretString, require_expiry: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = require_expiry;
        validation.validate_aud = false;
        validation.required_spec_claims = if require_expiry {
            HashSet::from(["exp".to_string()])
        } else {
            HashSet::new()
        };

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify a credential and extract the caller's identity
    pub fn validate(&self, credential: &str) -> Result<Identity, AuthFailure> {
        let token_data = decode::<VerifiedClaims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "credential rejected");
                AuthFailure::InvalidToken
            })?;

        // Non-string and empty values count as absent
        match token_data.claims.user_id {
            Some(serde_json::Value::String(user_id)) if !user_id.is_empty() => {
                Ok(Identity { user_id })
            }
            _ => Err(AuthFailure::MissingIdentityClaim),
        }
    }
}

/// Sign a credential for `user_id` with the fleet secret
///
/// With `ttl` set, the credential carries `iat`/`exp` claims.
pub fn mint_credential(
    secret: &SecretString,
    user_id: &str,
    ttl: Option<Duration>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let (iat, exp) = match ttl {
        Some(ttl) => {
            let now = chrono::Utc::now().timestamp();
            let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            (Some(now), Some(now.saturating_add(ttl)))
        }
        None => (None, None),
    };

    let claims = MintedClaims { user_id, iat, exp };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
}
