//! Release service binary.
//!
//! Standalone HTTP service that cuts releases on GitHub and GitLab.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::Notifier;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use releases::{
    build_router, AppState, Config, FileRepositoryStore, LogFormat, MemoryRepositoryStore,
    ReleaseOrchestrator, RepositoryStore, ScmProviderFactory,
};

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("releases=info".parse()?);

    if format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(LogFormat::from_env())?;

    info!("Starting release service...");

    let config = Config::from_env();

    for (name, settings) in [
        ("GitHub", &config.providers.github),
        ("GitLab", &config.providers.gitlab),
    ] {
        if settings.token.is_none() {
            info!(provider = name, "No token configured - releases on this provider will fail");
        }
    }

    let store: Arc<dyn RepositoryStore> = match &config.store_path {
        Some(path) => {
            let store = FileRepositoryStore::new(path);
            info!(path = %store.path().display(), "Using file repository store");
            Arc::new(store)
        }
        None => {
            info!("REPOSITORY_STORE_PATH not set - repository records are kept in memory");
            Arc::new(MemoryRepositoryStore::new())
        }
    };

    let notifier = Arc::new(Notifier::from_env());

    let orchestrator = ReleaseOrchestrator::new(
        Arc::new(ScmProviderFactory::new(config.providers.clone())),
        Arc::clone(&store),
        notifier,
    )
    .with_poll_policy(config.poll)
    .with_status_mapping(config.statuses.clone());

    info!(
        max_attempts = config.poll.max_attempts,
        delay_ms = u64::try_from(config.poll.delay.as_millis()).unwrap_or(u64::MAX),
        "Mergeability polling configured"
    );

    let app = build_router(AppState {
        orchestrator: Arc::new(orchestrator),
        store,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Release service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
