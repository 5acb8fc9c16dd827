use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use promptforge_queue::{ImageQueue, JobStore, MemoryJobStore, PgJobStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptforge_api::background;
use promptforge_api::config::{LogFormat, ServerConfig, StoreBackend};
use promptforge_api::router::build_app_router;
use promptforge_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "promptforge_api=debug,promptforge_queue=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = %config.store_backend,
        "Loaded server configuration",
    );

    // --- Job store ---
    let store: Arc<dyn JobStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set when STORE_BACKEND=postgres");

            let pool = promptforge_db::create_pool(database_url, config.database_max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            promptforge_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            promptforge_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgJobStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory job store; state is lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    let queue = ImageQueue::with_system_clock(store, config.queue.clone());

    // --- Background tasks ---
    let cancel = tokio_util::sync::CancellationToken::new();
    let monitor_handle = tokio::spawn(background::queue_monitor::run(
        queue.clone(),
        Duration::from_secs(config.queue_monitor_interval_secs.max(1)),
        cancel.clone(),
    ));

    // --- App state & router ---
    let state = AppState {
        queue,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, monitor_handle).await.is_err() {
        tracing::warn!("Queue monitor did not stop within the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
