//! Content renderers for the Ona content server.
//!
//! This crate provides:
//! - [`RenderEngine`]: per-node selection between pass-through and markdown
//! - [`MarkdownRenderer`]: markdown to HTML with raw HTML allowed and `nofollow` links
//! - [`plain_text`]: reduces rendered markup to text for search indexing
//!
//! # Example
//!
//! ```
//! use ona_renderer::{MarkdownRenderer, plain_text};
//!
//! let html = MarkdownRenderer::new().render("# Hello\n\n**Bold** text");
//! assert_eq!(plain_text(&html), "Hello\nBold text\n");
//! ```

mod engine;
mod renderer;
mod text;

pub use engine::RenderEngine;
pub use renderer::MarkdownRenderer;
pub use text::{escape_html, plain_text};
