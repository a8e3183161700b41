use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::Config;
use crate::error::FunctionError;
use crate::genai::{self, TranscriptionModel, UploadedFile};
use crate::media;
use crate::server::AppState;
use crate::storage::{ObjectLocation, ObjectStore};
use crate::utils::{format_duration, format_file_size};
use crate::Result;

pub mod event;

pub use event::{StorageEvent, StorageObjectData};

/// Instruction sent alongside the audio
pub const TRANSCRIPTION_PROMPT: &str = "Transcribe this audio file. Provide only the transcribed text without any additional formatting or speaker identification.";

/// Name of the object a transcript of `source_name` is written to
pub fn transcript_object_name(source_name: &str) -> String {
    format!("transcription-{}.txt", source_name)
}

/// Summary of a completed transcription
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionOutcome {
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    pub characters: usize,
}

/// Download, transcribe, write back; the first failing step aborts the run
///
/// Nothing is retried and nothing is cleaned up. Redelivery of the same event
/// downloads the same object and overwrites the same destination key.
pub struct TranscriptionPipeline {
    storage: Arc<dyn ObjectStore>,
    model: Arc<dyn TranscriptionModel>,
    destination_bucket: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl TranscriptionPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        model: Arc<dyn TranscriptionModel>,
        config: &Config,
    ) -> Self {
        Self {
            storage,
            model,
            destination_bucket: config.storage.transcription_bucket.clone(),
            poll_interval: Duration::from_secs(config.genai.poll_interval_secs),
            max_poll_attempts: config.genai.max_poll_attempts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.storage.clone(), state.model.clone(), &state.config)
    }

    /// Run the pipeline for a storage event
    pub async fn handle_event(&self, event: &StorageEvent) -> Result<TranscriptionOutcome> {
        event.log();

        let source = ObjectLocation::new(&event.data.bucket, &event.data.name);
        self.transcribe_object(&source).await
    }

    /// Transcribe one object into the destination bucket
    pub async fn transcribe_object(&self, source: &ObjectLocation) -> Result<TranscriptionOutcome> {
        let start = Instant::now();

        let destination = ObjectLocation::new(
            self.destination_bucket()?,
            transcript_object_name(&source.key),
        );

        let audio = self.download(source).await?;
        let file = self.submit(audio, source).await?;
        let transcript = self.transcribe(&file).await?;
        let characters = transcript.chars().count();
        self.write(&destination, transcript).await?;

        tracing::info!(
            source = %source,
            destination = %destination,
            characters,
            elapsed = %format_duration(start.elapsed()),
            "Transcription completed successfully"
        );

        Ok(TranscriptionOutcome {
            source: source.clone(),
            destination,
            characters,
        })
    }

    fn destination_bucket(&self) -> Result<&str> {
        self.destination_bucket
            .as_deref()
            .ok_or_else(|| FunctionError::Config("TRANSCRIPTION_BUCKET is not set".to_string()))
    }

    async fn download(&self, source: &ObjectLocation) -> Result<Bytes> {
        let audio = self
            .storage
            .get_object(&source.bucket, &source.key)
            .await
            .map_err(|e| FunctionError::storage("Failed to read source object", e))?;

        tracing::info!(source = %source, size = %format_file_size(audio.len() as u64), "Source object downloaded");
        Ok(audio)
    }

    async fn submit(&self, audio: Bytes, source: &ObjectLocation) -> Result<UploadedFile> {
        let display_name = format!("transcription-{}", Uuid::new_v4());

        let file = self
            .model
            .upload_file(audio, media::mime_type(&source.key), &display_name)
            .await
            .map_err(|e| FunctionError::provider("Unable to upload file", e))?;

        genai::wait_until_active(
            self.model.as_ref(),
            file,
            self.poll_interval,
            self.max_poll_attempts,
        )
        .await
        .map_err(|e| FunctionError::provider("Unable to upload file", e))
    }

    async fn transcribe(&self, file: &UploadedFile) -> Result<String> {
        let response = self
            .model
            .generate_content(file, TRANSCRIPTION_PROMPT)
            .await
            .map_err(|e| FunctionError::provider("Unable to generate contents", e))?;

        let text = response.first_text().ok_or(FunctionError::EmptyResponse)?;
        tracing::info!(file = %file.name, "Audio transcription completed");

        Ok(text.to_string())
    }

    async fn write(&self, destination: &ObjectLocation, transcript: String) -> Result<()> {
        self.storage
            .put_object(
                &destination.bucket,
                &destination.key,
                Bytes::from(transcript),
                "text/plain; charset=utf-8",
            )
            .await
            .map_err(|e| FunctionError::storage("Failed to write transcription", e))
    }
}

/// `POST /events/storage`
///
/// Non-2xx answers make the platform redeliver the event.
pub async fn storage_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let event = StorageEvent::from_http(&headers, &body)?;

    TranscriptionPipeline::from_state(&state)
        .handle_event(&event)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
