//! SynapScribe functions - request and event handlers for a media transcription backend
//!
//! Each handler validates its input, calls one managed service (identity provider,
//! object storage, or a generative transcription model) and serializes the answer.
//! The handlers share nothing at runtime beyond the clients built at startup.

pub mod cli;
pub mod config;
pub mod error;
pub mod functions;
pub mod genai;
pub mod identity;
pub mod media;
pub mod server;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{ErrorResponse, FunctionError};
pub use functions::transcription::{TranscriptionPipeline, StorageObjectData};
pub use media::MediaType;
pub use server::{build_router, AppState};

/// Result type used by the handlers
pub type Result<T> = std::result::Result<T, FunctionError>;
