//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::Args;
use ona_config::{CliSettings, Config};
use ona_site::{Site, SiteLoader};

pub(crate) use export::ExportArgs;
pub(crate) use serve::ServeArgs;

use crate::error::CliError;
use crate::output::Output;

/// Arguments shared by commands that load a site.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover ona.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory (overrides config).
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

impl SiteArgs {
    /// Load configuration with these arguments and extra overrides applied.
    fn load_config(&self, mut settings: CliSettings) -> Result<Config, CliError> {
        settings.site_dir.clone_from(&self.dir);
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}

/// Load the site named by the configuration.
fn load_site(config: &Config, output: &Output) -> Result<Site, CliError> {
    let dir = &config.site_resolved.dir;
    output.info(&format!("Site directory: {}", dir.display()));
    Ok(SiteLoader::new(dir).load()?)
}
