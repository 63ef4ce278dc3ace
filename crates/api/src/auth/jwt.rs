//! Access-token signing/verification and refresh-token helpers.
//!
//! Access tokens are HMAC-signed JWTs carrying a typed [`Claims`] payload.
//! Refresh tokens are opaque random strings with no signature at all; they
//! are only ever used as a lookup key, and only their SHA-256 hash is stored
//! server-side so a database leak does not compromise active sessions.

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use warden_core::error::AuthError;
use warden_core::types::{DbId, Timestamp};

/// JWT claims embedded in every access token.
///
/// Deserialization is the validation step: a token whose `sub` or `did` is
/// missing or not an integer is rejected before any handler sees it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Device the token was issued to.
    pub did: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Symmetric secret used to sign and verify access tokens.
    pub secret: String,
    /// HMAC algorithm (HS256, HS384 or HS512).
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
/// Default signing algorithm.
const DEFAULT_ALGORITHM: &str = "HS256";

/// Number of random bytes in a refresh token (hex encoded to twice as many chars).
pub const REFRESH_TOKEN_BYTES: usize = 32;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ALGORITHM`            | no       | `HS256` |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty, or if any other value
    /// fails to parse.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let algorithm = parse_algorithm(
            &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| DEFAULT_ALGORITHM.to_string()),
        )
        .unwrap_or_else(|e| panic!("{e}"));

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            algorithm,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

/// Parse an algorithm name, accepting only the HMAC family.
pub fn parse_algorithm(raw: &str) -> Result<Algorithm, String> {
    let algorithm = Algorithm::from_str(raw.trim())
        .map_err(|_| format!("Unknown JWT_ALGORITHM '{raw}'"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(format!(
            "JWT_ALGORITHM {other:?} is not supported; use HS256, HS384 or HS512"
        )),
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Mints access and refresh tokens. Holds only immutable key material.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    header: Header,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(config.algorithm),
            access_ttl: config.access_token_ttl(),
        }
    }

    /// Sign an access token for `user_id` on `device_id`, expiring one access
    /// TTL from now.
    pub fn new_access_token(
        &self,
        user_id: DbId,
        device_id: DbId,
    ) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let claims = Claims {
            sub: user_id,
            did: device_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(AccessToken { token, expires_at })
    }

    /// Generate an opaque refresh token from the OS entropy source.
    pub fn new_refresh_token(&self) -> Result<String, AuthError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::Signing(format!("entropy source failure: {e}")))?;
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Validates access tokens against the configured key and algorithm.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        // `exp` is required by default; `sub`, `did` and `iat` are enforced by
        // deserializing into `Claims`.
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Validate signature, algorithm and expiry and return the claims.
    ///
    /// Only the configured algorithm is accepted, so `none` and any
    /// algorithm substitution fail as [`AuthError::InvalidSignature`].
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidSignature,
            })
    }
}

/// Compute the SHA-256 hex digest of a refresh token.
///
/// Use this to compare an incoming refresh token against the stored hash.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
