// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{TokenClaims, TokenError};

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Token for `id` expiring `ttl` from now.
    pub fn issue(&self, id: &str, username: &str) -> Result<String, TokenError> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Issue("expiry out of range".to_string()))?;
        self.issue_with_expiry(id, username, expires_at)
    }

    pub fn issue_with_expiry(
        &self,
        id: &str,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            id: id.to_string(),
            username: username.to_string(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// Check signature and expiry. No clock-skew leeway: a token is
    /// rejected as soon as its embedded expiry passes.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::days(60))
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let issuer = issuer();
        let token = issuer.issue("u1", "jane").unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.username, "jane");

        let expected = (Utc::now() + Duration::days(60)).timestamp();
        assert!((claims.exp - expected).abs() <= 5);
    }

    #[test]
    fn token_fails_once_expiry_elapses() {
        let issuer = issuer();
        let token = issuer
            .issue_with_expiry("u1", "jane", Utc::now() - Duration::seconds(5))
            .unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = TokenIssuer::new("other-secret", Duration::days(1))
            .issue("u1", "jane")
            .unwrap();
        assert_eq!(issuer().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn unrepresentable_expiry_is_an_issue_error() {
        let issuer = TokenIssuer::new("test-secret", Duration::MAX);
        assert!(matches!(issuer.issue("u1", "jane"), Err(TokenError::Issue(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(issuer().verify("not-a-jwt"), Err(TokenError::Malformed));
    }
}
