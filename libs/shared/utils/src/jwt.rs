use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use shared_models::auth::JwtClaims;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Invalid claims encoding")]
    InvalidEncoding,

    #[error("Invalid claims format")]
    InvalidClaims,
}

/// Decodes the payload of a backend-issued token. The signature is not
/// verified here; only the backend holds the secret.
pub fn decode_claims(token: &str) -> Result<JwtClaims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(JwtError::InvalidFormat);
    }

    let claims_b64 = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| JwtError::InvalidEncoding)?;

    let claims: JwtClaims = serde_json::from_slice(&bytes).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        JwtError::InvalidClaims
    })?;

    Ok(claims)
}

/// A token without `exp` never expires on the client side.
pub fn is_expired(claims: &JwtClaims, now: DateTime<Utc>) -> bool {
    match claims.exp {
        Some(exp) => now.timestamp() >= exp,
        None => false,
    }
}
