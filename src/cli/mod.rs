use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "synapscribe",
    about = "SynapScribe functions - account, media and transcription handlers",
    version,
    long_about = "Serves the SynapScribe HTTP handlers (register, login, profile, upload) and the storage-event transcription trigger. The transcription pipeline can also be run once from the command line."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve every handler over HTTP
    Serve {
        /// Override the listen port
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Transcribe one stored object into the transcription bucket
    Transcribe {
        /// Source object, e.g. gs://bucket/audio/interview.mp3
        #[arg(value_name = "GS_URL")]
        location: String,
    },

    /// Run the pipeline for a structured storage event read from a file or stdin
    TranscribeEvent {
        /// CloudEvent JSON file (reads stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Inspect the effective configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
