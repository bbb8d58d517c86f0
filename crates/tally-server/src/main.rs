//! Tally server
//!
//! - `GET /`        : greeting
//! - `GET /slow`    : simulated heavy task
//! - `GET /metrics` : Prometheus scrape
//!
//! Config comes from the YAML file named by `TALLY_CONFIG` (defaults when
//! unset) with `PORT` overriding the listen port.

use tally_core::error::Result;
use tally_server::{app_state::AppState, config, router, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_from_env()?;
    let loki = telemetry::init(&cfg.logging.loki)?;

    let state = AppState::new(&cfg)?;
    let sampler = state.defaults().map(|d| d.spawn());
    let app = router::build_router(state);

    let listen = cfg.listen();
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(%listen, "tally-server running at http://localhost:{}", cfg.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sampler) = sampler {
        sampler.abort();
    }
    if let Some(loki) = loki {
        loki.shutdown().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
