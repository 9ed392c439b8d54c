//! HTTP surface for the Rehber case service.
//!
//! Every handler authenticates the bearer session, runs one capability
//! check and then calls exactly one core service on the blocking pool.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod services;
pub mod state;

use std::io;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use log::{error, info};
use rehber_core::model::report::{MAX_IMAGE_BYTES, MAX_REPORT_IMAGES};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::services::ServeDir;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use config::Settings;
use state::AppState;

/// Room for a full set of base64 images plus the text fields.
pub const MAX_REQUEST_BYTES: usize = MAX_REPORT_IMAGES * MAX_IMAGE_BYTES * 4 / 3 + 1024 * 1024;

#[derive(Debug)]
pub enum ServeError {
    Address(String),
    Database(rehber_core::DbError),
    Io(io::Error),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(detail) => write!(f, "invalid listen address: {detail}"),
            Self::Database(err) => write!(f, "database open failed: {err}"),
            Self::Io(err) => write!(f, "server io failure: {err}"),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Address(_) => None,
        }
    }
}

impl From<io::Error> for ServeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rehber_core::DbError> for ServeError {
    fn from(value: rehber_core::DbError) -> Self {
        Self::Database(value)
    }
}

pub fn router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());
    let media_base = state
        .settings
        .storage
        .public_base
        .trim_end_matches('/')
        .to_string();

    Router::new()
        .route("/health", get(|| async { rehber_core::ping() }))
        .nest("/api", routes::api_routes())
        .nest_service(&media_base, media)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

/// Opens the database, binds and serves until Ctrl+C or SIGTERM.
pub async fn serve(settings: Settings) -> Result<(), ServeError> {
    let address = settings
        .server
        .address()
        .map_err(|err| ServeError::Address(err.to_string()))?;
    let conn = rehber_core::open_db(&settings.database.path)?;
    std::fs::create_dir_all(&settings.storage.media_dir)?;
    info!(
        "event=server_init module=server status=ok db={} media_dir={}",
        settings.database.path, settings.storage.media_dir
    );

    let app = router(AppState::new(conn, settings));
    let listener = TcpListener::bind(address).await?;
    info!("event=server_listen module=server status=ok address={address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("event=shutdown module=server status=ok signal=ctrl_c"),
            Err(err) => {
                error!("event=shutdown module=server status=error signal=ctrl_c error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("event=shutdown module=server status=ok signal=terminate");
            }
            Err(err) => {
                error!("event=shutdown module=server status=error signal=terminate error={err}");
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
}
