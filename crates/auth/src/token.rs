//! Bearer token issuance and verification (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{Claim, JwtClaims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Issue/verify seam for identity tokens. Opaque to the rest of the system
/// beyond the two claim fields.
pub trait TokenCodec: Send + Sync {
    fn issue(&self, claim: &Claim) -> Result<String, TokenError>;
    fn verify(&self, token: &str) -> Result<Claim, TokenError>;
}

/// HS256 implementation over a shared secret.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn issue(&self, claim: &Claim) -> Result<String, TokenError> {
        let claims = JwtClaims::issue(claim, Utc::now(), self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claim, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        Ok(data.claims.to_claim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guichet_core::{Role, UserId};

    #[test]
    fn issue_then_verify_round_trips_the_claim() {
        let codec = Hs256TokenCodec::new(b"test-secret", Duration::minutes(10));
        let claim = Claim::new(UserId::new(), Role::Agent);

        let token = codec.issue(&claim).unwrap();
        let verified = codec.verify(&token).unwrap();

        assert_eq!(verified, claim);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let codec = Hs256TokenCodec::new(b"secret-a", Duration::minutes(10));
        let other = Hs256TokenCodec::new(b"secret-b", Duration::minutes(10));
        let token = codec.issue(&Claim::new(UserId::new(), Role::Regular)).unwrap();

        assert_eq!(other.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative ttl puts exp well past the decoder's leeway.
        let codec = Hs256TokenCodec::new(b"secret", Duration::minutes(-10));
        let token = codec.issue(&Claim::new(UserId::new(), Role::Regular)).unwrap();

        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = Hs256TokenCodec::new(b"secret", Duration::minutes(10));
        assert_eq!(codec.verify("not-a-token").unwrap_err(), TokenError::Invalid);
    }
}
