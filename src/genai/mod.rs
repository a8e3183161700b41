use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

pub mod gemini;

pub use gemini::GeminiClient;

/// Errors raised by the generative model API
#[derive(thiserror::Error, Debug)]
pub enum GenAiError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("failed to send request: {0}")]
    Request(String),

    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode model response: {0}")]
    Decode(String),

    #[error("uploaded file {name} failed processing")]
    FileFailed { name: String },

    #[error("uploaded file {name} not ready after {attempts} checks")]
    FileNotReady { name: String, attempts: u32 },
}

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    StateUnspecified,
    Processing,
    Active,
    Failed,
}

/// A file held by the model provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default = "default_state")]
    pub state: FileState,
}

fn default_state() -> FileState {
    FileState::StateUnspecified
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Generative model able to transcribe an uploaded audio file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionModel: Send + Sync {
    /// Upload raw bytes to the provider's file store
    async fn upload_file(
        &self,
        data: Bytes,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, GenAiError>;

    /// Fetch the current metadata of an uploaded file
    async fn get_file(&self, name: &str) -> Result<UploadedFile, GenAiError>;

    /// Run the model on an uploaded file with a text prompt
    async fn generate_content(
        &self,
        file: &UploadedFile,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GenAiError>;
}

/// Poll an uploaded file until the provider marks it active
pub async fn wait_until_active(
    model: &dyn TranscriptionModel,
    file: UploadedFile,
    interval: Duration,
    max_attempts: u32,
) -> Result<UploadedFile, GenAiError> {
    let mut file = file;
    let mut check_count = 0;

    loop {
        match file.state {
            FileState::Active => return Ok(file),
            FileState::Failed => return Err(GenAiError::FileFailed { name: file.name }),
            FileState::Processing | FileState::StateUnspecified => {
                if check_count >= max_attempts {
                    return Err(GenAiError::FileNotReady {
                        name: file.name,
                        attempts: check_count,
                    });
                }
                check_count += 1;

                tracing::debug!(file = %file.name, check = check_count, "Waiting for uploaded file to become active");
                sleep(interval).await;
                file = model.get_file(&file.name).await?;
            }
        }
    }
}
