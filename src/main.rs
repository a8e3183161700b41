use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use synapscribe_functions::{
    cli::{Cli, Commands},
    config::Config,
    functions::transcription::{StorageEvent, TranscriptionPipeline},
    server::{self, AppState},
    storage::ObjectLocation,
};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "synapscribe_functions=debug,synapscribe=debug,tower_http=debug"
    } else {
        "synapscribe_functions=info,synapscribe=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await?;
        }
        Commands::Transcribe { location } => {
            let source = ObjectLocation::parse_gcs_url(&location)
                .with_context(|| format!("Expected gs://bucket/object, got {}", location))?;

            let pipeline = pipeline(config).await?;
            let outcome = pipeline.transcribe_object(&source).await?;
            println!("Transcription written to: {}", outcome.destination);
        }
        Commands::TranscribeEvent { file } => {
            let body = match file {
                Some(path) => fs_err::read(&path)?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .context("Failed to read event from stdin")?;
                    buf
                }
            };

            let event = StorageEvent::from_structured(&body)?;
            let pipeline = pipeline(config).await?;
            let outcome = pipeline.handle_event(&event).await?;
            println!("Transcription written to: {}", outcome.destination);
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let missing = config.validate();
                if missing.is_empty() {
                    println!("Configuration complete");
                } else {
                    println!("Missing settings:");
                    for key in missing {
                        println!("  • {}", key);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn pipeline(config: Config) -> Result<TranscriptionPipeline> {
    let state = AppState::from_config(config).await?;
    Ok(TranscriptionPipeline::from_state(&state))
}
