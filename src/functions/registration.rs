use axum::{extract::State, http::StatusCode, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::JsonBody;
use crate::error::FunctionError;
use crate::server::AppState;
use crate::Result;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").expect("email pattern is valid")
});

const MIN_PASSWORD_LENGTH: usize = 8;

/// Candidate account submitted for registration
#[derive(Clone, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Registered account; the password is never echoed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl NewAccount {
    /// Check email shape, password strength and name, in that order
    pub fn validate(&self) -> Result<()> {
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(FunctionError::validation("invalid email format"));
        }

        // length is measured in UTF-8 bytes
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(FunctionError::validation(
                "password must be at least 8 characters long",
            ));
        }

        let has_upper = self.password.chars().any(char::is_uppercase);
        let has_lower = self.password.chars().any(char::is_lowercase);
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());
        if !(has_upper && has_lower && has_digit) {
            return Err(FunctionError::validation(
                "password must contain at least one uppercase letter, one lowercase letter, and one number",
            ));
        }

        if self.name.trim().is_empty() {
            return Err(FunctionError::validation("name cannot be empty"));
        }

        Ok(())
    }
}

/// `POST /register`
#[tracing::instrument(skip_all, fields(email = %account.email))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(account): JsonBody<NewAccount>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    account.validate()?;

    let id = state
        .identity
        .create_user(&account.email, &account.password, &account.name)
        .await
        .map_err(|e| FunctionError::provider("Failed to register user", e))?;

    tracing::info!(uid = %id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id,
            email: account.email,
            name: account.name,
        }),
    ))
}
