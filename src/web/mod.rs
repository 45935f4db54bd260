mod response;
mod routes;

pub use response::{ApiResponse, ResponseStatus};
pub use routes::AddRequest;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::archiver::ArchiveService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: ArchiveService,
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(service: ArchiveService) -> Result<()> {
    let config = service.config();
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(service);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
///
/// Only the snapshot tree `<data_dir>/archive` is served, at `<prefix>/archive`.
/// The rest of the data directory holds ArchiveBox's own database and secrets.
pub fn create_app(service: ArchiveService) -> Router {
    let config = service.config();
    let mount = format!("{}/archive", config.static_url_prefix.trim_end_matches('/'));
    let archive_dir = config.data_dir.join("archive");
    info!(mount = %mount, dir = %archive_dir.display(), "Serving archive assets");

    Router::new()
        .merge(routes::router())
        .nest_service(&mount, ServeDir::new(archive_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}
