//! Application state.
//!
//! Shared, read-only state for all requests.

use std::sync::Arc;
use std::time::Duration;

use ona_site::Site;

use crate::minify::Minifier;
use crate::sanitize::Sanitizer;

/// Application state shared across all requests.
pub(crate) struct AppState {
    /// Loaded site snapshot.
    pub(crate) site: Arc<Site>,
    /// Sanitizer applied to decoded request paths.
    pub(crate) sanitizer: Box<dyn Sanitizer>,
    /// Minifier applied to rendered pages.
    pub(crate) minifier: Box<dyn Minifier>,
    /// Limit on resolution, rendering and minification of one request.
    pub(crate) request_timeout: Duration,
}
