//! Access and refresh token issuance.
//!
//! Access tokens are HMAC-signed JWTs whose subject is the user's email.
//! Refresh tokens are opaque UUIDv7 values; their only meaning is the
//! `auth_sessions` row that currently holds them.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token generation failed: {0}")]
    GenerationFailed(jsonwebtoken::errors::Error),
    #[error("Token verification failed: {0}")]
    VerificationFailed(jsonwebtoken::errors::Error),
    #[error("Unsupported signing algorithm {0:?}, expected HS256, HS384 or HS512")]
    UnsupportedAlgorithm(Algorithm),
    #[error("Token lifetime overflows the supported date range")]
    ExpiryOutOfRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        secret: &str,
        algorithm: Algorithm,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> Result<Self, JwtError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(JwtError::UnsupportedAlgorithm(algorithm));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_ttl,
            refresh_token_ttl,
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    /// Génère un access token avec la durée configurée
    pub fn generate_access_token(&self, subject: &str) -> Result<String, JwtError> {
        self.generate_token(subject, self.access_token_ttl)
    }

    pub fn generate_token(&self, subject: &str, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(JwtError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(JwtError::GenerationFailed)
    }

    /// Checks signature, algorithm and expiry. Accepts an optional
    /// `"Bearer "` prefix.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let token = token.trim();
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(JwtError::VerificationFailed)
    }

    /// Time-ordered but unpredictable: 48 bits of timestamp, 74 random bits.
    pub fn generate_refresh_token(&self) -> Uuid {
        Uuid::now_v7()
    }

    pub fn refresh_token_expires_at(&self) -> Result<DateTime<Utc>, JwtError> {
        Utc::now()
            .checked_add_signed(self.refresh_token_ttl)
            .ok_or(JwtError::ExpiryOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn issuer_with(secret: &str, algorithm: Algorithm) -> TokenIssuer {
        TokenIssuer::new(secret, algorithm, Duration::minutes(30), Duration::days(7))
            .expect("HMAC algorithm")
    }

    fn issuer() -> TokenIssuer {
        issuer_with("my_secret_key_for_tests", Algorithm::HS256)
    }

    #[test]
    fn generate_and_decode_round_trips_the_subject() {
        let issuer = issuer();
        let token = issuer.generate_access_token("a@x.com").unwrap();

        let claims = issuer.decode_access_token(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("a@x.com"));
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn generated_token_is_a_three_part_jwt() {
        let token = issuer().generate_access_token("a@x.com").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn decode_accepts_bearer_prefix() {
        let issuer = issuer();
        let token = issuer.generate_access_token("a@x.com").unwrap();

        let claims = issuer
            .decode_access_token(&format!("Bearer {token}"))
            .unwrap();
        assert_eq!(claims.sub.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn decode_rejects_token_signed_with_another_secret() {
        let token = issuer_with("other_secret", Algorithm::HS256)
            .generate_access_token("a@x.com")
            .unwrap();

        assert!(matches!(
            issuer().decode_access_token(&token),
            Err(JwtError::VerificationFailed(_))
        ));
    }

    #[test]
    fn decode_rejects_token_signed_with_another_algorithm() {
        let token = issuer_with("my_secret_key_for_tests", Algorithm::HS384)
            .generate_access_token("a@x.com")
            .unwrap();

        assert!(issuer().decode_access_token(&token).is_err());
    }

    #[test]
    fn decode_rejects_tampered_payload() {
        let issuer = issuer();
        let token = issuer.generate_access_token("a@x.com").unwrap();
        let other = issuer.generate_access_token("admin@x.com").unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(issuer.decode_access_token(&forged).is_err());
    }

    #[test]
    fn decode_rejects_expired_token() {
        let issuer = issuer();
        let token = issuer
            .generate_token("a@x.com", Duration::minutes(-1))
            .unwrap();

        assert!(issuer.decode_access_token(&token).is_err());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let issuer = issuer();
        assert!(issuer.decode_access_token("invalid.token.here").is_err());
        assert!(issuer.decode_access_token("").is_err());
        assert!(issuer.decode_access_token("Bearer ").is_err());
    }

    #[test]
    fn decode_keeps_missing_subject_as_none() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let issuer = issuer();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSubject {
                exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(b"my_secret_key_for_tests"),
        )
        .unwrap();

        let claims = issuer.decode_access_token(&token).unwrap();
        assert_eq!(claims.sub, None);
    }

    #[test]
    fn new_rejects_asymmetric_algorithms() {
        let result = TokenIssuer::new(
            "secret",
            Algorithm::RS256,
            Duration::minutes(30),
            Duration::days(7),
        );
        assert!(matches!(
            result,
            Err(JwtError::UnsupportedAlgorithm(Algorithm::RS256))
        ));
    }

    #[test]
    fn refresh_tokens_are_unique_time_ordered_uuids() {
        let issuer = issuer();
        let tokens: Vec<Uuid> = (0..1000).map(|_| issuer.generate_refresh_token()).collect();

        assert!(tokens.iter().all(|t| t.get_version_num() == 7));
        let distinct: HashSet<_> = tokens.iter().collect();
        assert_eq!(distinct.len(), tokens.len());
    }

    #[test]
    fn out_of_range_lifetimes_are_errors_not_panics() {
        let issuer = TokenIssuer::new(
            "my_secret_key_for_tests",
            Algorithm::HS256,
            Duration::MAX,
            Duration::MAX,
        )
        .unwrap();

        assert!(matches!(
            issuer.generate_access_token("a@x.com"),
            Err(JwtError::ExpiryOutOfRange)
        ));
        assert!(matches!(
            issuer.refresh_token_expires_at(),
            Err(JwtError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn refresh_token_expiry_uses_the_configured_window() {
        let issuer = issuer();
        let before = Utc::now();
        let expires_at = issuer.refresh_token_expires_at().unwrap();

        let window = expires_at - before;
        assert!(window >= Duration::days(7));
        assert!(window < Duration::days(7) + Duration::seconds(5));
    }
}
