use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{
    IdentityError, IdentityProvider, ProviderUser, SignInResponse, TokenVerifier, VerifiedToken,
};
use crate::config::IdentityConfig;

/// Identity Toolkit REST client
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    verifier: TokenVerifier,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserInfo>,
}

/// User record as returned by `accounts:lookup`; timestamps arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    valid_since: Option<String>,
    #[serde(default)]
    disabled: bool,
}

impl UserInfo {
    fn into_provider_user(self) -> Result<ProviderUser, IdentityError> {
        let created_at_millis = match self.created_at {
            Some(raw) => raw
                .parse()
                .map_err(|_| IdentityError::Decode(format!("createdAt is not a number: {}", raw)))?,
            None => 0,
        };
        let valid_since = self
            .valid_since
            .map(|raw| {
                raw.parse()
                    .map_err(|_| IdentityError::Decode(format!("validSince is not a number: {}", raw)))
            })
            .transpose()?;

        Ok(ProviderUser {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            created_at_millis,
            valid_since,
            disabled: self.disabled,
        })
    }
}

impl IdentityToolkitClient {
    pub fn new(http: reqwest::Client, config: &IdentityConfig) -> Self {
        let verifier = TokenVerifier::new(
            http.clone(),
            config.jwks_url.clone(),
            config.project_id.clone(),
        );

        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            verifier,
        }
    }

    fn api_key(&self) -> Result<&str, IdentityError> {
        self.api_key
            .as_deref()
            .ok_or(IdentityError::MissingApiKey("FIREBASE_API_KEY"))
    }

    /// POST a JSON body to `accounts:<method>` and decode the answer
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, IdentityError> {
        let url = url::Url::parse_with_params(
            &format!("{}/accounts:{}", self.endpoint, method),
            &[("key", self.api_key()?)],
        )
        .map_err(|e| IdentityError::Request(format!("invalid endpoint: {}", e)))?;

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Request(format!("failed to read response body: {}", e.without_url())))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| IdentityError::Decode(e.to_string()))
    }

    async fn lookup(&self, id_token: &str) -> Result<ProviderUser, IdentityError> {
        let response: LookupResponse = self.call("lookup", json!({ "idToken": id_token })).await?;

        response
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::UserNotFound)?
            .into_provider_user()
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError> {
        let response: SignUpResponse = self
            .call(
                "signUp",
                json!({
                    "email": email,
                    "password": password,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        tracing::info!(uid = %response.local_id, "Account created");
        Ok(response.local_id)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, IdentityError> {
        self.call(
            "signInWithPassword",
            json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }),
        )
        .await
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedToken, IdentityError> {
        self.verifier.verify(id_token).await
    }

    async fn verify_id_token_and_check_revoked(
        &self,
        id_token: &str,
    ) -> Result<VerifiedToken, IdentityError> {
        let token = self.verifier.verify(id_token).await?;
        let user = self.lookup(id_token).await?;

        if user.uid != token.uid {
            return Err(IdentityError::InvalidToken("token subject does not match account".to_string()));
        }
        if user.disabled {
            return Err(IdentityError::Disabled);
        }
        if user.revokes(token.issued_at) {
            return Err(IdentityError::Revoked);
        }

        Ok(token)
    }

    async fn get_user(&self, id_token: &str) -> Result<ProviderUser, IdentityError> {
        self.lookup(id_token).await
    }

    async fn update_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<ProviderUser, IdentityError> {
        let _: serde_json::Value = self
            .call(
                "update",
                json!({
                    "idToken": id_token,
                    "displayName": display_name,
                    "returnSecureToken": false,
                }),
            )
            .await?;

        // the update answer omits timestamps, so read the full record back
        self.lookup(id_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_response_parsing() {
        let body = r#"{
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": "uid-1",
                "email": "ada@example.com",
                "displayName": "Ada",
                "createdAt": "1700000000123",
                "validSince": "1700000000",
                "lastLoginAt": "1700000500000"
            }]
        }"#;

        let response: LookupResponse = serde_json::from_str(body).unwrap();
        let user = response.users.into_iter().next().unwrap().into_provider_user().unwrap();

        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.display_name, "Ada");
        assert_eq!(user.created_at_millis, 1_700_000_000_123);
        assert_eq!(user.valid_since, Some(1_700_000_000));
        assert!(!user.disabled);
    }

    #[test]
    fn test_bad_timestamp_is_a_decode_error() {
        let info = UserInfo {
            local_id: "uid-1".to_string(),
            email: String::new(),
            display_name: String::new(),
            created_at: Some("yesterday".to_string()),
            valid_since: None,
            disabled: false,
        };
        assert!(matches!(info.into_provider_user(), Err(IdentityError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let client = IdentityToolkitClient::new(reqwest::Client::new(), &IdentityConfig::default());
        let err = client
            .sign_in_with_password("a@b.com", "Passw0rd")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::MissingApiKey("FIREBASE_API_KEY")));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_carry_api_key() {
        let config = IdentityConfig {
            api_key: Some("SECRET-KEY-123".to_string()),
            endpoint: "http://127.0.0.1:1/v1".to_string(),
            ..IdentityConfig::default()
        };
        let client = IdentityToolkitClient::new(reqwest::Client::new(), &config);

        let err = client
            .sign_in_with_password("a@b.com", "Passw0rd")
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::Request(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }
}
