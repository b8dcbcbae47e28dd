use crate::batch::Batcher;
use crate::config::load_config;
use crate::pipeline::{run_batcher, run_reader, PipelineError};
use crate::sink::JsonLinesSink;
use crate::source::EnvelopeReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("batcher error: {0}")]
    Batcher(#[from] crate::batch::InvalidConfig),

    #[error("sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/windrow/config.yml");
            eprintln!("  /etc/windrow/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'windrow config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_pipeline(&config_path).await.map_err(|e| e.into())
}

async fn run_pipeline(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");

    let config = load_config(config_path)?;

    info!(
        path = %config.source.path.display(),
        follow = config.source.follow,
        "Creating source reader"
    );
    let reader = EnvelopeReader::new(&config.source, config.pipeline.on_parse_error);

    info!(path = %config.sink.path.display(), "Opening sink");
    let sink = JsonLinesSink::open(&config.sink)?;

    let batcher = Batcher::new(config.batcher_config())?;
    info!(
        inputs = config.inputs.len(),
        time_window = config.batch.time_window,
        compress_output = config.batch.compress_output,
        "Batcher initialized"
    );

    let (event_tx, event_rx) = mpsc::channel(config.pipeline.buffer_limit);

    let mut reader_handle = tokio::spawn(run_reader(reader, event_tx));
    let batcher_handle = tokio::spawn(run_batcher(event_rx, batcher, sink));

    info!("Pipeline started, press Ctrl+C to shutdown");

    // The reader owns the only sender, so once it finishes or is aborted the
    // channel closes and the batcher drains and shuts down on its own.
    let mut reader_error: Option<PipelineError> = None;
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            reader_handle.abort();
        }
        result = &mut reader_handle => {
            match result {
                Ok(Ok(())) => info!("Source reader completed"),
                Ok(Err(e)) => {
                    error!(error = %e, "Source reader error");
                    reader_error = Some(e);
                }
                Err(e) => error!(error = %e, "Source reader join error"),
            }
        }
    }

    info!("Waiting for pipeline tasks to complete");

    match batcher_handle.await {
        Ok(Ok(())) => info!("Batcher task completed successfully"),
        Ok(Err(e)) => return Err(e.into()),
        Err(e) => return Err(e.into()),
    }

    if let Some(e) = reader_error {
        return Err(e.into());
    }

    info!("Pipeline shutdown complete");

    Ok(())
}
