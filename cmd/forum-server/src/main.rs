//! # forum-server
//!
//! Assembles the forum service from configuration: picks a storage backend,
//! wires the services and serves the axum router until a shutdown signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::{router, AppState};
use configs::{DatabaseBackend, LogSettings, Settings};
use services::Services;
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-postgres")]
use secrecy::ExposeSecret;
#[cfg(feature = "db-postgres")]
use storage_adapters::PgStore;

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Storage handle kept alive by `main` so the pool can be closed on exit.
enum Backend {
    Memory,
    #[cfg(feature = "db-postgres")]
    Postgres(Arc<PgStore>),
}

impl Backend {
    async fn close(self) {
        match self {
            Backend::Memory => {}
            #[cfg(feature = "db-postgres")]
            Backend::Postgres(store) => store.close().await,
        }
    }
}

async fn connect(settings: &Settings) -> Result<(Services, Backend)> {
    match settings.database.backend {
        DatabaseBackend::Memory => {
            warn!("using the in-memory store, data is lost on restart");
            Ok((Services::new(Arc::new(MemoryStore::new())), Backend::Memory))
        }
        #[cfg(feature = "db-postgres")]
        DatabaseBackend::Postgres => {
            let db = &settings.database;
            let store = PgStore::connect(db.url.expose_secret(), db.max_connections, db.acquire_timeout())
                .await
                .context("connecting to postgres")?;
            let store = Arc::new(store);
            Ok((Services::new(store.clone()), Backend::Postgres(store)))
        }
        #[cfg(not(feature = "db-postgres"))]
        DatabaseBackend::Postgres => anyhow::bail!("this build does not include the postgres backend"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("ctrl-c listener error: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("SIGTERM listener error: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    let (services, backend) = connect(&settings).await?;
    let app = router(AppState::new(services));

    let addr = settings.server.addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, backend = ?settings.database.backend, "forum server listening");

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
    backend.close().await;
    served.context("serving http")?;

    info!("forum server stopped");
    Ok(())
}
