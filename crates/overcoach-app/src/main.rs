// Overcoach entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the hero/map catalog (both requests must succeed)
// 4. Create mpsc channels and the application state
// 5. Spawn app logic task
// 6. Run the terminal front end until the user quits
// 7. Cleanup on exit

use std::sync::Arc;

use overcoach_app::app;
use overcoach_app::cli;
use overcoach_app::config;
use overcoach_client::{load_catalog, CoachClient, OverfastClient};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Overcoach starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: catalog={}, coach={}",
        config.catalog.base_url, config.coach.base_url
    );

    // 3. Load the catalog. Both clients share one connection pool.
    let http = reqwest::Client::new();
    let overfast = OverfastClient::with_http(http.clone(), config.catalog.base_url.clone());
    let catalog = match load_catalog(&overfast).await {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("Catalog load failed: {}", e);
            eprintln!("Failed to load data from OverFast API");
            return Err(e).context("catalog load failed");
        }
    };

    // 4. Create mpsc channels and the application state
    let (service_tx, service_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let coach = Arc::new(CoachClient::with_http(http, config.coach.base_url.clone()));
    let max_alternatives = config.session.max_alternatives_shown;
    let app_state = app::AppState::new(config, catalog, coach, service_tx);

    // 5. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, service_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Run the front end (blocks until the user quits or stdin closes)
    info!("Application ready");
    if let Err(e) = cli::run(ui_rx, cmd_tx, max_alternatives).await {
        error!("Front end error: {}", e);
    }

    // 7. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Overcoach shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the front end).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("overcoach.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("overcoach=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
