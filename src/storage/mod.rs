use async_trait::async_trait;
use bytes::Bytes;

pub mod s3;

pub use s3::S3ObjectStore;

/// Errors raised by object storage backends
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),
}

/// Bucket + key addressed blob store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object with the same key
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Read a whole object
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;
}

/// Location of an object in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a `gs://bucket/object` URL
    pub fn parse_gcs_url(url: &str) -> Option<Self> {
        let path = url.strip_prefix("gs://")?;
        let (bucket, key) = path.split_once('/')?;

        if bucket.is_empty() || key.is_empty() {
            return None;
        }

        Some(Self::new(bucket, key))
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.key)
    }
}

/// Build the public URL of an object
pub fn public_url(base: &str, bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, encoded_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gcs_url() {
        assert_eq!(
            ObjectLocation::parse_gcs_url("gs://b/audio/interview.mp3"),
            Some(ObjectLocation::new("b", "audio/interview.mp3"))
        );
        assert_eq!(ObjectLocation::parse_gcs_url("s3://b/key"), None);
        assert_eq!(ObjectLocation::parse_gcs_url("gs://bucket-only"), None);
        assert_eq!(ObjectLocation::parse_gcs_url("gs://b/"), None);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(ObjectLocation::new("b", "x.mp3").to_string(), "gs://b/x.mp3");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://storage.cloud.google.com/", "synapscribe-media", "video/clip.mp4"),
            "https://storage.cloud.google.com/synapscribe-media/video/clip.mp4"
        );
        assert_eq!(
            public_url("https://storage.cloud.google.com", "m", "audio/my song.mp3"),
            "https://storage.cloud.google.com/m/audio/my%20song.mp3"
        );
    }
}
