/**
 * Authentication Boundary
 *
 * Identity comes from an external provider as an HS256 JWT whose subject
 * is the caller's profile id. The token is read from the `Authorization:
 * Bearer` header or, for websocket upgrades where browsers cannot set
 * headers, from a `token` query parameter.
 *
 * Extraction never rejects a request: a missing or invalid token yields no
 * identity, and the operation being called decides whether that is
 * `Unauthorized`.
 */

use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Tokens issued by [`TokenVerifier::issue`] expire after 30 days
const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Verified caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub profile_id: Uuid,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token subject is not a profile id: {0}")]
    InvalidSubject(String),
}

/// Signs and verifies identity tokens with a shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `profile_id`
    ///
    /// The identity provider normally does this; the server only needs it
    /// for local tooling and tests.
    pub fn issue(&self, profile_id: Uuid) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let claims = Claims {
            sub: profile_id.to_string(),
            exp: now + TOKEN_TTL_SECS,
            iat: now,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify signature and expiry, then read the profile id
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        let profile_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AuthError::InvalidSubject(data.claims.sub.clone()))?;
        Ok(Identity { profile_id })
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    #[serde(default)]
    token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

fn query_token(parts: &Parts) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
}

/// Axum extractor for the caller's identity, if any
#[derive(Debug, Clone, Copy)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    TokenVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts).or_else(|| query_token(parts)) else {
            return Ok(MaybeIdentity(None));
        };

        let verifier = TokenVerifier::from_ref(state);
        match verifier.verify(&token) {
            Ok(identity) => Ok(MaybeIdentity(Some(identity))),
            Err(e) => {
                tracing::warn!("[Auth] Rejected token: {}", e);
                Ok(MaybeIdentity(None))
            }
        }
    }
}
