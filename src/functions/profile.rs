use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FunctionError;
use crate::identity::ProviderUser;
use crate::server::AppState;
use crate::Result;

/// Header the gateway forwards the caller's credential in
pub const FORWARDED_AUTHORIZATION: &str = "x-forwarded-authorization";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    /// RFC 3339, UTC, second precision
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
}

impl From<ProviderUser> for Profile {
    fn from(user: ProviderUser) -> Self {
        Self {
            id: user.uid,
            email: user.email,
            name: user.display_name,
            created_at: format_creation_time(user.created_at_millis),
        }
    }
}

/// Epoch milliseconds to an RFC 3339 timestamp, dropping sub-second precision
pub fn format_creation_time(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp(millis.div_euclid(1000), 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Token from `X-Forwarded-Authorization: Bearer <token>`; anything else is no token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FORWARDED_AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

/// `GET|PUT /profile`
///
/// The token is verified before the method is looked at, so unsupported methods
/// without a credential still answer 401.
pub async fn profile(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Profile>> {
    let id_token = bearer_token(&headers).ok_or_else(|| FunctionError::auth("No token provided"))?;

    let token = state
        .identity
        .verify_id_token_and_check_revoked(id_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Profile token rejected");
            FunctionError::auth("Invalid token")
        })?;

    tracing::debug!(uid = %token.uid, method = %method, "Profile request");

    match method {
        Method::GET => get_profile(&state, id_token).await,
        Method::PUT => update_profile(&state, id_token, &body).await,
        _ => Err(FunctionError::MethodNotAllowed),
    }
    .map(Json)
}

async fn get_profile(state: &AppState, id_token: &str) -> Result<Profile> {
    let user = state
        .identity
        .get_user(id_token)
        .await
        .map_err(|e| FunctionError::provider("Error getting user", e))?;

    Ok(user.into())
}

async fn update_profile(state: &AppState, id_token: &str, body: &[u8]) -> Result<Profile> {
    let update: ProfileUpdate = serde_json::from_slice(body)
        .map_err(|e| FunctionError::validation(format!("Invalid request body: {}", e)))?;

    let user = state
        .identity
        .update_display_name(id_token, &update.name)
        .await
        .map_err(|e| FunctionError::provider("Error updating user", e))?;

    tracing::info!(uid = %user.uid, "Profile updated");
    Ok(user.into())
}
