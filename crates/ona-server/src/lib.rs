//! HTTP server for the Ona content server.
//!
//! Serves a loaded [`Site`] over HTTP with axum. Every request goes through a
//! single dispatcher:
//!
//! ```text
//! request ─► method check ─► normalize path ─► static asset? ─► 200 / 304
//!                                 │                 │
//!                                 └─► 303           └─► resolve node ─► 303 / 404
//!                                                          │
//!                                                          └─► render ─► minify ─► 200 / 304
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use ona_server::{ServerConfig, run_server};
//! use ona_site::SiteLoader;
//!
//! #[tokio::main]
//! async fn main() {
//!     let site = SiteLoader::new("site").load().unwrap();
//!     run_server(ServerConfig::default(), Arc::new(site)).await.unwrap();
//! }
//! ```

mod app;
mod dispatch;
mod error;
mod language;
mod minify;
mod normalize;
mod sanitize;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ona_site::Site;
use state::AppState;

pub use error::ServerError;
pub use minify::{MimeMinifier, Minifier, MinifyError};
pub use sanitize::{Sanitizer, StrictSanitizer};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Limit on resolution, rendering and minification of one request.
    pub request_timeout: Duration,
    /// Transport-level limit on a whole request.
    pub hard_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 10000,
            request_timeout: Duration::from_secs(4),
            hard_timeout: Duration::from_secs(10),
        }
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails.
pub async fn run_server(config: ServerConfig, site: Arc<Site>) -> Result<(), ServerError> {
    let state = Arc::new(AppState {
        site,
        sanitizer: Box::new(StrictSanitizer),
        minifier: Box::new(MimeMinifier),
        request_timeout: config.request_timeout,
    });
    let app = app::create_router(state, config.hard_timeout);

    let address = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| ServerError::InvalidAddress(address.clone()))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, stopping server..."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Create server configuration from the loaded config file.
#[must_use]
pub fn server_config_from_config(config: &ona_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        request_timeout: config.server.request_timeout(),
        hard_timeout: config.server.hard_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_server_config_from_config() {
        let mut config = ona_config::Config::default();
        config.server.host = "0.0.0.0".to_owned();
        config.server.port = 9000;
        config.server.request_timeout_secs = 2;
        config.server.hard_timeout_secs = 5;

        let server = server_config_from_config(&config);

        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 9000);
        assert_eq!(server.request_timeout, Duration::from_secs(2));
        assert_eq!(server.hard_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_server_config_default_matches_config_file_default() {
        let from_file = server_config_from_config(&ona_config::Config::default());

        let server = ServerConfig::default();

        assert_eq!(server.host, from_file.host);
        assert_eq!(server.port, 10000);
        assert_eq!(server.port, from_file.port);
        assert_eq!(server.request_timeout, from_file.request_timeout);
        assert_eq!(server.hard_timeout, from_file.hard_timeout);
    }
}
