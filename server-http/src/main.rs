use freeseats::persistence::SledSeatStore;
use freeseats::planes::control::{DEFAULT_BUSES, init_schema};
use server_http::{AppState, build_backends, build_router};
use shared::config::Config;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting free seats HTTP Server...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    if let Err(e) = run(config).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> shared::Result<()> {
    let store_path = Path::new(&config.data_dir).join("seats.sled");
    info!("Opening store at {}", store_path.display());
    let store = Arc::new(SledSeatStore::new(&store_path)?);

    if config.skip_init {
        info!("Skipping bus table initialization");
    } else {
        init_schema(store.as_ref(), DEFAULT_BUSES).await?;
        store.flush()?;
    }

    // Create broadcast channel for SSE events (1000 event buffer capacity)
    let (event_tx, _event_rx) = broadcast::channel(1000);
    let shutdown = CancellationToken::new();

    let (backends, listeners) = build_backends(&config, store.clone(), &event_tx)?;

    for mut listener in listeners {
        let token = shutdown.clone();
        tokio::spawn(async move {
            // No in-process resubscription: a broken feed takes the process down
            if let Err(e) = listener.run(token).await {
                error!("Change feed listener failed, exiting: {}", e);
                std::process::exit(1);
            }
        });
    }

    let state = AppState::new(backends, event_tx)?;
    let router = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| shared::Error::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Start listen http://{}", addr);
    info!("Try: curl http://{}/1", addr);

    // Graceful shutdown handler
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .map_err(|e| shared::Error::Internal(format!("HTTP server error: {}", e)))?;

    shutdown.cancel();
    store.flush()?;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
    shutdown.cancel();
}
