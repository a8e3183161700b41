use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::{IdentityError, VerifiedToken};

/// Claims carried by a provider-issued ID token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    fn into_verified(self) -> Result<VerifiedToken, IdentityError> {
        if self.sub.is_empty() || self.sub.len() > 128 {
            return Err(IdentityError::InvalidToken("subject must be 1-128 characters".to_string()));
        }

        Ok(VerifiedToken {
            uid: self.sub,
            email: self.email,
            issued_at: self.iat,
            expires_at: self.exp,
        })
    }
}

/// Verifies RS256 ID tokens against the provider's JWK set
#[derive(Clone)]
pub struct TokenVerifier {
    http: reqwest::Client,
    jwks_url: String,
    project_id: String,
}

impl TokenVerifier {
    pub fn new(http: reqwest::Client, jwks_url: String, project_id: String) -> Self {
        Self {
            http,
            jwks_url,
            project_id,
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Validation rules for this project's tokens
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, IdentityError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::Request(format!("failed to fetch signing keys: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected {
                status: response.status().as_u16(),
                message: "signing key endpoint returned an error".to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Decode(format!("signing keys: {}", e.without_url())))
    }

    /// Check signature, issuer, audience, expiry and subject
    pub async fn verify(&self, id_token: &str) -> Result<VerifiedToken, IdentityError> {
        let header = decode_header(id_token)
            .map_err(|e| IdentityError::InvalidToken(format!("invalid token header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("token has no key ID".to_string()))?;

        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| IdentityError::InvalidToken(format!("key ID {} not found", kid)))?;

        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| IdentityError::InvalidToken(format!("unusable signing key: {}", e)))?;

        let data = decode::<TokenClaims>(id_token, &key, &self.validation()).map_err(|e| {
            tracing::debug!("ID token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    IdentityError::InvalidToken("token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    IdentityError::InvalidToken("incorrect issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    IdentityError::InvalidToken("incorrect audience".to_string())
                }
                _ => IdentityError::InvalidToken(e.to_string()),
            }
        })?;

        data.claims.into_verified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/jwks".to_string(),
            "synapscribe".to_string(),
        )
    }

    #[test]
    fn test_issuer_follows_project() {
        assert_eq!(verifier().issuer(), "https://securetoken.google.com/synapscribe");
    }

    #[test]
    fn test_claims_require_subject() {
        let claims = TokenClaims {
            sub: String::new(),
            iat: 1,
            exp: 2,
            email: None,
        };
        assert!(matches!(claims.into_verified(), Err(IdentityError::InvalidToken(_))));

        let claims = TokenClaims {
            sub: "uid-1".to_string(),
            iat: 1,
            exp: 2,
            email: Some("a@b.com".to_string()),
        };
        let verified = claims.into_verified().unwrap();
        assert_eq!(verified.uid, "uid-1");
        assert_eq!(verified.issued_at, 1);
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected_before_fetching_keys() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_hs256_token_is_rejected() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &serde_json::json!({"sub": "uid-1", "iat": 1, "exp": 4_000_000_000i64}),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }
}
