use serde::{Deserialize, Serialize};

/// Category an uploaded file is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Image => "image",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" | "wav" | "ogg" => Some(MediaType::Audio),
            "mp4" | "mov" | "avi" => Some(MediaType::Video),
            "jpg" | "jpeg" | "png" | "gif" => Some(MediaType::Image),
            _ => None,
        }
    }

    /// Classify a filename by its extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        extension(filename).and_then(Self::from_extension)
    }

    /// Object key the file is stored under
    pub fn object_key(&self, filename: &str) -> String {
        format!("{}/{}", self.as_str(), filename)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final path segment of a client-supplied filename; `None` when nothing usable remains
pub fn base_name(filename: &str) -> Option<&str> {
    filename
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Text after the last dot of the final segment, so `.mp3` has extension `mp3`
fn extension(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next()?;
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Get MIME type for a filename, falling back to a binary stream
pub fn mime_type(filename: &str) -> &'static str {
    let ext = extension(filename)
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/mp4",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(MediaType::from_filename("song.mp3"), Some(MediaType::Audio));
        assert_eq!(MediaType::from_filename("clip.mp4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_filename("photo.JPEG"), Some(MediaType::Image));
        assert_eq!(MediaType::from_filename("take.final.WAV"), Some(MediaType::Audio));
    }

    #[test]
    fn test_rejects_unlisted_extensions() {
        assert_eq!(MediaType::from_filename("x.pdf"), None);
        assert_eq!(MediaType::from_filename("noextension"), None);
        assert_eq!(MediaType::from_filename("track.flac"), None);
        assert_eq!(MediaType::from_filename("trailing."), None);
    }

    #[test]
    fn test_dotfile_uses_its_suffix() {
        assert_eq!(MediaType::from_filename(".mp3"), Some(MediaType::Audio));
        assert_eq!(mime_type(".mp3"), "audio/mpeg");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("clip.mp4"), Some("clip.mp4"));
        assert_eq!(base_name("../../secret/clip.mp4"), Some("clip.mp4"));
        assert_eq!(base_name("dir/sub/song.mp3"), Some("song.mp3"));
        assert_eq!(base_name("C:\\Users\\ada\\photo.png"), Some("photo.png"));
        assert_eq!(base_name("dir/"), Some("dir"));
        assert_eq!(base_name(""), None);
        assert_eq!(base_name("/"), None);
        assert_eq!(base_name("a/.."), None);
    }

    #[test]
    fn test_object_key() {
        assert_eq!(MediaType::Video.object_key("clip.mp4"), "video/clip.mp4");
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type("song.MP3"), "audio/mpeg");
        assert_eq!(mime_type("clip.mov"), "video/quicktime");
        assert_eq!(mime_type("blob"), "application/octet-stream");
    }
}
