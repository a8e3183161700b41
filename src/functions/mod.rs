//! The five handlers. Each one is a leaf: it only depends on the service traits
//! carried by [`crate::server::AppState`], never on another handler.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::FunctionError;

pub mod authentication;
pub mod media_upload;
pub mod profile;
pub mod registration;
pub mod transcription;

/// JSON body extractor that rejects with a 400 in the `{code, message}` shape
#[derive(Debug, Clone, Copy)]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for FunctionError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        FunctionError::validation("Invalid request body")
    }
}

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = FunctionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(inner))
    }
}
