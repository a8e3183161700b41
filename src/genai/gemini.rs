use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{GenAiError, GenerateContentResponse, TranscriptionModel, UploadedFile};
use crate::config::GenAiConfig;

/// Harm categories whose blocking threshold is lowered so transcripts are never filtered
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini REST client (Generative Language API, v1beta)
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: &GenAiConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn api_key(&self) -> Result<&str, GenAiError> {
        self.api_key.as_deref().ok_or(GenAiError::MissingApiKey)
    }

    fn url(&self, path: &str) -> Result<url::Url, GenAiError> {
        url::Url::parse_with_params(&format!("{}/{}", self.endpoint, path), &[("key", self.api_key()?)])
            .map_err(|e| GenAiError::Request(format!("invalid endpoint: {}", e)))
    }

    /// Request body for a transcription call
    pub fn generate_request(&self, file: &UploadedFile, prompt: &str) -> serde_json::Value {
        let safety_settings: Vec<SafetySetting> = SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: *category,
                threshold: "BLOCK_NONE",
            })
            .collect();

        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "fileData": { "mimeType": file.mime_type, "fileUri": file.uri } },
                    { "text": prompt },
                ],
            }],
            "safetySettings": safety_settings,
            "generationConfig": { "temperature": self.temperature },
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenAiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenAiError::Request(format!("failed to read response body: {}", e.without_url())))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(GenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| GenAiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TranscriptionModel for GeminiClient {
    /// Resumable upload: one request opens the session, a second sends the bytes and finalizes
    async fn upload_file(
        &self,
        data: Bytes,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, GenAiError> {
        let start = self
            .http
            .post(self.url("upload/v1beta/files")?)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| GenAiError::Request(e.without_url().to_string()))?;

        if !start.status().is_success() {
            let status = start.status().as_u16();
            let message = start.text().await.unwrap_or_default();
            return Err(GenAiError::Api { status, message });
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GenAiError::Decode("upload session has no upload URL".to_string()))?;

        let size = data.len();
        let response = self
            .http
            .post(upload_url)
            .header("Content-Length", size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(|e| GenAiError::Request(e.without_url().to_string()))?;

        let envelope: FileEnvelope = Self::read_json(response).await?;
        tracing::info!(file = %envelope.file.name, size_bytes = size, "Uploaded file to model provider");

        Ok(envelope.file)
    }

    async fn get_file(&self, name: &str) -> Result<UploadedFile, GenAiError> {
        let response = self
            .http
            .get(self.url(&format!("v1beta/{}", name))?)
            .send()
            .await
            .map_err(|e| GenAiError::Request(e.without_url().to_string()))?;

        Self::read_json(response).await
    }

    async fn generate_content(
        &self,
        file: &UploadedFile,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GenAiError> {
        let response = self
            .http
            .post(self.url(&format!("v1beta/models/{}:generateContent", self.model))?)
            .json(&self.generate_request(file, prompt))
            .send()
            .await
            .map_err(|e| GenAiError::Request(e.without_url().to_string()))?;

        Self::read_json(response).await
    }
}
