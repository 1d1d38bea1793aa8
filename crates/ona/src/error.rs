//! CLI error types.

use ona_config::ConfigError;
use ona_server::ServerError;
use ona_site::LoadError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{0}")]
    Export(String),
}
