use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use dubwave::config::Config;
use dubwave::editor::event::{EditorEvent, UserCommand};
use dubwave::services::api::ApiClient;
use dubwave::waveform::stub::StubWaveform;
use dubwave::EditorController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dubwave=info".into()),
        )
        .init();

    let config = Config::load("dubwave")?;
    info!(project_id = %config.editor.project_id, "dubwave editor starting");

    let client = ApiClient::new(
        &config.api.base_url,
        config.api.token.clone(),
        Duration::from_secs(config.api.timeout_secs),
    );

    let (tx, rx) = mpsc::channel(100);
    let mut controller = EditorController::new(rx, tx.clone());
    let mut backend = StubWaveform::new();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    tx.send(EditorEvent::Command(UserCommand::OpenProject {
        project_id: config.editor.project_id,
        audio_source: config.editor.audio_source,
    }))
    .await?;

    controller
        .run(
            client,
            &mut backend,
            cancel,
            Duration::from_millis(config.editor.tick_ms),
        )
        .await;

    Ok(())
}
