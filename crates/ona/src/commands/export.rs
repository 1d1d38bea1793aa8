//! `ona export` command implementation.
//!
//! Renders every enabled node through the rendering pipeline and writes the
//! unminified output below the target directory. A node at `/en/about` is
//! written to `<OUTPUT>/en/about/index.html` (or `index.txt` for plain text)
//! so that parents and children never collide.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use ona_config::CliSettings;
use ona_site::{RenderError, Site, render_node};

use super::{SiteArgs, load_site};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Directory to write rendered pages to.
    output: PathBuf,

    #[command(flatten)]
    site: SiteArgs,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails, a file cannot be written, or any
    /// node fails to render.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.site.load_config(CliSettings::default())?;
        let site = Arc::new(load_site(&config, &output)?);
        let report = export_site(&site, &self.output)?;

        for (path, error) in &report.failed {
            output.warning(&format!("Skipped {path}: {error}"));
        }
        output.success(&format!(
            "Exported {} pages to {}",
            report.written,
            self.output.display()
        ));

        if report.failed.is_empty() {
            Ok(())
        } else {
            Err(CliError::Export(format!(
                "{} of {} pages failed to render",
                report.failed.len(),
                report.failed.len() + report.written
            )))
        }
    }
}

/// Outcome of an export run.
#[derive(Debug, Default)]
struct ExportReport {
    written: usize,
    failed: Vec<(String, RenderError)>,
}

/// Render and write every enabled node that is not a redirect.
fn export_site(site: &Arc<Site>, output_dir: &Path) -> Result<ExportReport, CliError> {
    let mut report = ExportReport::default();

    for node in site.tree().nodes().filter(|n| n.enabled()) {
        if !node.data().redirect_to.trim().is_empty() {
            continue;
        }
        let page = match render_node(site, node.id()) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(path = %node.path(), error = %e, "Export render failed");
                report.failed.push((node.path().to_owned(), e));
                continue;
            }
        };

        let file = output_file(output_dir, node.path(), &page.mime_type);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, page.body)?;
        tracing::info!(path = %node.path(), file = %file.display(), "Exported page");
        report.written += 1;
    }

    Ok(report)
}

/// File a node path is exported to.
fn output_file(output_dir: &Path, node_path: &str, mime_type: &str) -> PathBuf {
    let mut file = output_dir.to_path_buf();
    for segment in node_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    {
        file.push(segment);
    }

    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    let name = match essence.to_lowercase().as_str() {
        "text/html" => "index.html",
        "text/plain" => "index.txt",
        _ => "index",
    };
    file.push(name);
    file
}
