use std::net::SocketAddr;

use alumni_match::{config::Config, create_router, utils::init_logger, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_logger(
        "alumni_match=debug,tower_http=debug,axum=info",
        config.server.log_dir.as_deref(),
    );
    info!(
        port = config.server.port,
        backend = ?config.index.backend,
        "Configuration loaded"
    );

    // Build shared state (profiles, index, optional startup indexing)
    let state = AppState::initialize(&config).await.map_err(|e| {
        error!(error = %e, "Startup failed");
        anyhow::anyhow!("Startup failed: {}", e)
    })?;

    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    state.shutdown();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
