//! Identity provider seam
//!
//! Handlers only see the [`IdentityProvider`] trait. The production implementation
//! talks to the Identity Toolkit REST API and verifies ID tokens locally against
//! the provider's published signing keys.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod token;
pub mod toolkit;

pub use token::{TokenClaims, TokenVerifier};
pub use toolkit::IdentityToolkitClient;

/// Errors raised while talking to the identity provider
#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("{0} environment variable is not set")]
    MissingApiKey(&'static str),

    #[error("failed to send request: {0}")]
    Request(String),

    /// The provider answered with a non-success status
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("invalid ID token: {0}")]
    InvalidToken(String),

    #[error("ID token has been revoked")]
    Revoked,

    #[error("user account is disabled")]
    Disabled,

    #[error("user not found")]
    UserNotFound,
}

/// Successful password sign-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id_token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: String,
    pub local_id: String,
    #[serde(default)]
    pub display_name: String,
}

/// Claims of a verified ID token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    /// Issued-at, seconds since the epoch
    pub issued_at: i64,
    /// Expiry, seconds since the epoch
    pub expires_at: i64,
}

/// The provider's user record
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    /// Account creation time, milliseconds since the epoch
    pub created_at_millis: i64,
    /// Tokens issued before this time (seconds since the epoch) are revoked
    pub valid_since: Option<i64>,
    pub disabled: bool,
}

impl ProviderUser {
    /// Whether a token issued at `issued_at` was revoked for this account
    pub fn revokes(&self, issued_at: i64) -> bool {
        self.valid_since.map_or(false, |since| issued_at < since)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account, returning its uid
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError>;

    /// Exchange email and password for an ID token
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, IdentityError>;

    /// Verify signature, issuer, audience and expiry of an ID token
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedToken, IdentityError>;

    /// Like `verify_id_token`, additionally rejecting revoked tokens and disabled accounts
    async fn verify_id_token_and_check_revoked(
        &self,
        id_token: &str,
    ) -> Result<VerifiedToken, IdentityError>;

    /// Read the record of the user the token belongs to
    async fn get_user(&self, id_token: &str) -> Result<ProviderUser, IdentityError>;

    /// Change only the display name, returning the updated record
    async fn update_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<ProviderUser, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(valid_since: Option<i64>) -> ProviderUser {
        ProviderUser {
            uid: "uid-1".to_string(),
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
            created_at_millis: 1_700_000_000_000,
            valid_since,
            disabled: false,
        }
    }

    #[test]
    fn test_revocation_window() {
        assert!(!user(None).revokes(10));
        assert!(user(Some(100)).revokes(99));
        assert!(!user(Some(100)).revokes(100));
        assert!(!user(Some(100)).revokes(150));
    }

    #[test]
    fn test_sign_in_response_tolerates_missing_fields() {
        let parsed: SignInResponse =
            serde_json::from_str(r#"{"idToken":"tok","localId":"uid-1","email":"a@b.com"}"#).unwrap();
        assert_eq!(parsed.id_token, "tok");
        assert_eq!(parsed.display_name, "");
    }
}
