use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FunctionError;
use crate::media::{self, MediaType};
use crate::server::AppState;
use crate::storage::public_url;
use crate::utils::format_file_size;
use crate::Result;

/// Largest accepted upload body
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Form field carrying the file
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadResponse {
    pub file_url: String,
    pub file_name: String,
    pub file_type: MediaType,
    pub uploaded_at: DateTime<Utc>,
}

fn parse_error(status: StatusCode) -> FunctionError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        FunctionError::TooLarge(format!(
            "File exceeds the {} upload limit",
            format_file_size(MAX_UPLOAD_BYTES as u64)
        ))
    } else {
        FunctionError::validation("Failed to parse form")
    }
}

/// `POST /upload`
///
/// Objects are keyed `<type>/<filename>` using only the final segment of the
/// submitted filename; a second upload with the same name replaces the first.
pub async fn upload_media(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<MediaUploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| parse_error(rejection.status()))?;

    let (file_name, file_type, data) = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(FunctionError::validation("No file uploaded")),
            Err(e) => return Err(parse_error(e.status())),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(media::base_name)
            .map(str::to_string)
            .ok_or_else(|| FunctionError::validation("No file uploaded"))?;

        let file_type = MediaType::from_filename(&file_name)
            .ok_or_else(|| FunctionError::validation("Unsupported file type"))?;

        let data = field.bytes().await.map_err(|e| parse_error(e.status()))?;
        break (file_name, file_type, data);
    };

    let bucket = &state.config.storage.media_bucket;
    let key = file_type.object_key(&file_name);

    tracing::info!(
        bucket = %bucket,
        key = %key,
        size = %format_file_size(data.len() as u64),
        "Storing uploaded media"
    );

    state
        .storage
        .put_object(bucket, &key, data, media::mime_type(&file_name))
        .await
        .map_err(|e| FunctionError::storage("Failed to upload file", e))?;

    Ok(Json(MediaUploadResponse {
        file_url: public_url(&state.config.storage.public_url_base, bucket, &key),
        file_name,
        file_type,
        uploaded_at: Utc::now(),
    }))
}
