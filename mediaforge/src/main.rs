use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mediaforge::api::{ApiServer, ApiServerConfig, AppState};
use mediaforge::config::AppConfig;
use mediaforge::engine::{EngineParts, EngineSettings, FfmpegRunner, JobEngine};
use mediaforge::logging;
use mediaforge::notification::WebhookNotifier;
use mediaforge::probe::FfprobeProbe;
use mediaforge::registry::Registry;
use mediaforge::storage::BlobStore;
use mediaforge::tts::SimulatedSynthesizer;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env_or_default();

    let (logging_config, _log_guard) = logging::init_logging(&config.log_dir)?;
    let background = CancellationToken::new();
    logging_config.start_retention_cleanup(background.clone());

    let blobs = BlobStore::new(&config.storage_dir);
    blobs
        .ensure_root()
        .await
        .context("failed to create the storage directory")?;
    let registry = Arc::new(Registry::in_memory(blobs));

    let engine = Arc::new(JobEngine::new(
        registry,
        EngineParts {
            runner: Arc::new(FfmpegRunner::new(&config.ffmpeg_path)),
            probe: Arc::new(FfprobeProbe::new(&config.ffprobe_path)),
            notifier: Arc::new(WebhookNotifier::new(config.webhook_timeout)),
            synthesizer: Arc::new(SimulatedSynthesizer::new(config.tts_delay)),
        },
        EngineSettings::from_config(&config),
    ));

    let state = AppState::new(engine.clone()).with_logging_config(logging_config);
    let server = ApiServer::new(ApiServerConfig::from_app_config(&config), state);

    let shutdown = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    info!(
        storage = %config.storage_dir.display(),
        ffmpeg = %config.ffmpeg_path,
        "mediaforge starting"
    );
    server.run().await?;

    background.cancel();
    info!(
        in_flight = engine.registry().processing_count(),
        "Waiting for running jobs"
    );
    engine.wait_idle().await;
    info!("mediaforge stopped");

    Ok(())
}
