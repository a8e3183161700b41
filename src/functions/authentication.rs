use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::JsonBody;
use crate::error::FunctionError;
use crate::server::AppState;
use crate::Result;

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// `POST /login`
///
/// Proof of password (sign-in call) and trust in the returned token (local
/// verification) are separate steps that fail independently.
#[tracing::instrument(skip_all, fields(email = %login.email))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(login): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let signed_in = state
        .identity
        .sign_in_with_password(&login.email, &login.password)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Password sign-in failed");
            FunctionError::auth("Authentication failed")
        })?;

    let token = state
        .identity
        .verify_id_token(&signed_in.id_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Returned ID token did not verify");
            FunctionError::auth("Invalid ID token")
        })?;

    tracing::info!(uid = %token.uid, "User authenticated");

    Ok(Json(LoginResponse {
        id_token: signed_in.id_token,
        user: User {
            id: token.uid,
            email: signed_in.email,
            name: signed_in.display_name,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, MockIdentityProvider, SignInResponse, VerifiedToken};
    use crate::server::test_support::server_with_identity;
    use axum::http::StatusCode;
    use serde_json::json;

    fn sign_in() -> SignInResponse {
        SignInResponse {
            id_token: "id-token".to_string(),
            email: "ada@example.com".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: "3600".to_string(),
            local_id: "uid-1".to_string(),
            display_name: "Ada".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in_with_password()
            .times(1)
            .returning(|_, _| Ok(sign_in()));
        identity
            .expect_verify_id_token()
            .withf(|token| token == "id-token")
            .times(1)
            .returning(|_| {
                Ok(VerifiedToken {
                    uid: "uid-1".to_string(),
                    email: Some("ada@example.com".to_string()),
                    issued_at: 1,
                    expires_at: 3601,
                })
            });

        let server = server_with_identity(identity);
        let response = server
            .post("/login")
            .json(&json!({"email": "ada@example.com", "password": "Passw0rd"}))
            .await;

        response.assert_status_ok();
        let body: LoginResponse = response.json();
        assert_eq!(body.id_token, "id-token");
        assert_eq!(
            body.user,
            User {
                id: "uid-1".to_string(),
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_sign_in_with_password().returning(|_, _| {
            Err(IdentityError::Rejected {
                status: 400,
                message: "INVALID_PASSWORD".to_string(),
            })
        });
        identity.expect_verify_id_token().times(0);

        let server = server_with_identity(identity);
        let response = server
            .post("/login")
            .json(&json!({"email": "ada@example.com", "password": "nope"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unverifiable_token_is_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in_with_password()
            .returning(|_, _| Ok(sign_in()));
        identity
            .expect_verify_id_token()
            .returning(|_| Err(IdentityError::InvalidToken("bad signature".to_string())));

        let server = server_with_identity(identity);
        let response = server
            .post("/login")
            .json(&json!({"email": "ada@example.com", "password": "Passw0rd"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Invalid ID token");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = server_with_identity(MockIdentityProvider::new());
        let response = server
            .post("/login")
            .text("email=ada")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
