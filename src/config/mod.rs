use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Identity provider settings
    pub identity: IdentityConfig,

    /// Object storage settings
    pub storage: StorageConfig,

    /// Generative model settings
    pub genai: GenAiConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Web API key for the Identity Toolkit REST endpoints
    pub api_key: Option<String>,

    /// Project ID, used as the expected token audience
    pub project_id: String,

    /// Identity Toolkit base URL
    pub endpoint: String,

    /// JWK set used to verify ID tokens
    pub jwks_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket receiving uploaded media
    pub media_bucket: String,

    /// Bucket receiving transcripts
    pub transcription_bucket: Option<String>,

    /// S3-compatible endpoint
    pub endpoint: String,

    /// Signing region
    pub region: String,

    /// Base used to build public object URLs
    pub public_url_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenAiConfig {
    /// Gemini API key
    pub api_key: Option<String>,

    /// Generative Language API base URL
    pub endpoint: String,

    pub model: String,

    pub temperature: f32,

    /// Seconds between file readiness checks
    pub poll_interval_secs: u64,

    /// Readiness checks before giving up
    pub max_poll_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: "synapscribe".to_string(),
            endpoint: "https://identitytoolkit.googleapis.com/v1".to_string(),
            jwks_url: "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
                .to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_bucket: "synapscribe-media".to_string(),
            transcription_bucket: None,
            endpoint: "https://storage.googleapis.com".to_string(),
            region: "auto".to_string(),
            public_url_base: "https://storage.cloud.google.com".to_string(),
        }
    }
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.4,
            poll_interval_secs: 2,
            max_poll_attempts: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get configuration file path, if one exists
    fn config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("synapscribe").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Override settings from environment variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FIREBASE_API_KEY") {
            self.identity.api_key = Some(key);
        }
        if let Some(project) = non_empty("FIREBASE_PROJECT_ID") {
            self.identity.project_id = project;
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.genai.api_key = Some(key);
        }
        if let Some(bucket) = non_empty("TRANSCRIPTION_BUCKET") {
            self.storage.transcription_bucket = Some(bucket);
        }
        if let Some(bucket) = non_empty("MEDIA_BUCKET") {
            self.storage.media_bucket = bucket;
        }
        if let Some(endpoint) = non_empty("STORAGE_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Some(region) = non_empty("STORAGE_REGION") {
            self.storage.region = region;
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }

        Ok(())
    }

    /// List settings that are missing; handlers needing them fail at call time
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.identity.api_key.is_none() {
            missing.push("FIREBASE_API_KEY - required for registration, login and profile");
        }
        if self.genai.api_key.is_none() {
            missing.push("GEMINI_API_KEY - required for transcription");
        }
        if self.storage.transcription_bucket.is_none() {
            missing.push("TRANSCRIPTION_BUCKET - required for transcription");
        }

        missing
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Identity Project: {}", self.identity.project_id);
        println!("  Identity API Key: {}", mask(self.identity.api_key.as_deref()));
        println!("  Media Bucket: {}", self.storage.media_bucket);
        println!(
            "  Transcription Bucket: {}",
            self.storage.transcription_bucket.as_deref().unwrap_or("(not set)")
        );
        println!("  Storage Endpoint: {}", self.storage.endpoint);
        println!("  Model: {}", self.genai.model);
        println!("  Gemini API Key: {}", mask(self.genai.api_key.as_deref()));
        println!("  Listen: {}:{}", self.server.host, self.server.port);
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(s) if s.chars().count() > 4 => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            format!("****{}", tail)
        }
        Some(_) => "****".to_string(),
        None => "(not set)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.media_bucket, "synapscribe-media");
        assert_eq!(config.genai.model, "gemini-1.5-pro");
        assert_eq!(config.server.port, 8080);
        assert!(config.storage.transcription_bucket.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FIREBASE_API_KEY", "fb-key"),
            ("GEMINI_API_KEY", "gm-key"),
            ("TRANSCRIPTION_BUCKET", "transcripts"),
            ("PORT", "9090"),
            ("MEDIA_BUCKET", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.identity.api_key.as_deref(), Some("fb-key"));
        assert_eq!(config.genai.api_key.as_deref(), Some("gm-key"));
        assert_eq!(config.storage.transcription_bucket.as_deref(), Some("transcripts"));
        assert_eq!(config.server.port, 9090);
        // blank values are ignored
        assert_eq!(config.storage.media_bucket, "synapscribe-media");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_invalid_port() {
        let mut config = Config::default();
        assert!(config
            .apply_env(|key| (key == "PORT").then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn test_partial_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "storage:\n  media_bucket: my-media\ngenai:\n  temperature: 0.2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage.media_bucket, "my-media");
        assert_eq!(config.storage.region, "auto");
        assert!((config.genai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.genai.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_validate_reports_missing_keys() {
        let missing = Config::default().validate();
        assert_eq!(missing.len(), 3);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(Some("abcdefgh")), "****efgh");
        assert_eq!(mask(Some("abc")), "****");
        assert_eq!(mask(None), "(not set)");
    }

    #[test]
    fn test_mask_multibyte_tail() {
        assert_eq!(mask(Some("clé-secrète")), "****rète");
        assert_eq!(mask(Some("ключ-ключ")), "****ключ");
        assert_eq!(mask(Some("éééé")), "****");
    }
}
