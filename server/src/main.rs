//! Todo API server.
//!
//! Serves the todo list on `localhost:8000`, persisting to `TODO_FILE`
//! (default `todos.json`).

use std::sync::Arc;

use todo_api_core::snapshot_store::SnapshotStore;
use todo_api_runtime::Store;
use todo_server::{load_todos, todo_router, Config, FileSnapshotStore, TodoEnvironment, TodoReducer, TodoState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(todo_file = %config.todo_file.display(), "Starting todo server");

    let snapshots: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(&config.todo_file));
    let records = load_todos(snapshots.as_ref()).await;

    let store = Arc::new(Store::new(
        TodoState::from_records(records),
        TodoReducer::new(),
        TodoEnvironment::new(snapshots),
    ));

    let app = todo_router(Arc::clone(&store));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server started at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    store.shutdown(config.shutdown_timeout).await?;

    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
