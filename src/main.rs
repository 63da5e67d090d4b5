use anyhow::Context;
use fill_ledger::datasource::HttpBackend;
use fill_ledger::orchestration::{backfill, ControllerSettings, LedgerController};
use fill_ledger::{api, config::Config, DataSource};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let datasource: Arc<dyn DataSource> = Arc::new(HttpBackend::new(config.backend_api_url.clone()));
    let controller = LedgerController::spawn(ControllerSettings::from(&config), Arc::clone(&datasource));

    if config.history_on_startup {
        let handle = controller.clone();
        let source = Arc::clone(&datasource);
        tokio::spawn(async move {
            match backfill(&handle, source.as_ref()).await {
                Ok(count) => tracing::info!(count, "history backfill complete"),
                Err(e) => tracing::warn!(error = %e, "history backfill aborted"),
            }
        });
    } else {
        controller
            .replay_history(Vec::new())
            .await
            .context("ledger controller stopped before startup")?;
    }

    // Create router
    let app = api::create_router(api::AppState::new(controller));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    // Run server
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
