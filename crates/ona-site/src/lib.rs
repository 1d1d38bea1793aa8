//! Content tree, path resolution and page rendering for Ona.
//!
//! This crate provides:
//! - [`ContentTree`]: nodes with inherited attributes, stored as an index arena
//! - [`resolve`]: exact, endpoint, fallback and language-negotiated resolution
//! - [`TemplateRegistry`]: named templates chained into layouts
//! - [`render_node`]: executes a node's template chain
//! - [`SiteLoader`]: builds a [`Site`] from a site directory
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use ona_site::{Resolution, SiteLoader, render_node};
//!
//! let site = Arc::new(SiteLoader::new("www").load()?);
//!
//! if let Some(Resolution::Exact(id)) = site.resolve("/en/about", &[]) {
//!     let page = render_node(&site, id)?;
//!     println!("{} ({})", page.body, page.mime_type);
//! }
//! # Ok(())
//! # }
//! ```

mod context;
mod headers;
mod loader;
mod node;
mod pipeline;
mod public;
mod resolver;
mod search;
mod site;
mod template;
mod tree;

pub use headers::{HeaderLine, HeaderRule, HeaderRuleDefinition, HeaderRules};
pub use loader::{LoadError, SiteLoader};
pub use node::{
    Node, NodeDefinition, Property, PropertyDefinition, Scalar, escape_segment, parse_flag,
    sibling_order,
};
pub use pipeline::{RenderError, RenderedPage, render_node};
pub use public::{PublicFile, PublicFiles};
pub use resolver::{
    Resolution, find_endpoint_node, find_fallback_node, find_language_root, find_node,
    normalize_path, resolve,
};
pub use search::{MemoryIndex, SearchHit, SearchIndex, SearchResult, clean_query, search_results};
pub use site::Site;
pub use template::{
    Template, TemplateDefinition, TemplateError, TemplateRegistry, TemplateRegistryBuilder,
};
pub use tree::{ContentTree, ContentTreeBuilder, NodeId, NodeRef};
