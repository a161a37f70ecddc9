use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;

use storefront_api::{app_router, config, db, events, migrator, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let pool = db::establish_connection(&cfg)
        .await
        .context("connecting to database")?;
    let pool = Arc::new(pool);
    if cfg.auto_migrate {
        migrator::run_migrations(&pool)
            .await
            .context("running migrations")?;
    }

    let (event_sender, event_rx) = events::event_channel(1024);
    tokio::spawn(events::process_events(event_rx));

    let state = AppState::new(pool, cfg, event_sender);
    state
        .auth
        .bootstrap_admin(&state.config)
        .await
        .context("bootstrapping admin account")?;

    let addr = state.config.bind_addr();
    let app = app_router(state);
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
