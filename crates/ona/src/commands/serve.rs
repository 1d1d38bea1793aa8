//! `ona serve` command implementation.

use std::sync::Arc;

use clap::Args;
use ona_config::CliSettings;
use ona_server::{run_server, server_config_from_config};

use super::{SiteArgs, load_site};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or loading fails, or the server
    /// fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.site.load_config(CliSettings {
            host: self.host,
            port: self.port,
            site_dir: None,
        })?;
        let site = Arc::new(load_site(&config, &output)?);

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        run_server(server_config_from_config(&config), site).await?;

        Ok(())
    }
}
