//! Loaded site: content tree plus everything needed to serve it.
//!
//! A [`Site`] is built once at startup and shared read-only behind an
//! `Arc` by every request. Nothing in it is mutated after construction.

use std::fmt;

use ona_renderer::plain_text;

use crate::headers::HeaderRules;
use crate::public::PublicFiles;
use crate::resolver::{self, Resolution};
use crate::search::{SearchIndex, SearchResult, search_results};
use crate::template::TemplateRegistry;
use crate::tree::ContentTree;

/// Immutable snapshot of a loaded site.
pub struct Site {
    tree: ContentTree,
    templates: TemplateRegistry,
    public_files: PublicFiles,
    header_rules: HeaderRules,
    search: Box<dyn SearchIndex>,
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("nodes", &self.tree.len())
            .field("templates", &self.templates)
            .field("public_files", &self.public_files.len())
            .field("header_rules", &self.header_rules.len())
            .field("indexed", &self.search.doc_count())
            .finish()
    }
}

impl Site {
    /// Assemble a site and index every enabled node for search.
    #[must_use]
    pub fn new(
        tree: ContentTree,
        templates: TemplateRegistry,
        public_files: PublicFiles,
        header_rules: HeaderRules,
        mut search: Box<dyn SearchIndex>,
    ) -> Self {
        for node in tree.nodes().filter(|n| n.enabled()) {
            search.index(node.path(), &plain_text(&node.render()));
        }
        Self {
            tree,
            templates,
            public_files,
            header_rules,
            search,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    #[must_use]
    pub fn public_files(&self) -> &PublicFiles {
        &self.public_files
    }

    #[must_use]
    pub fn header_rules(&self) -> &HeaderRules {
        &self.header_rules
    }

    #[must_use]
    pub fn search_index(&self) -> &dyn SearchIndex {
        self.search.as_ref()
    }

    /// Resolve a request path. See [`resolver::resolve`].
    #[must_use]
    pub fn resolve(&self, path: &str, languages: &[String]) -> Option<Resolution> {
        resolver::resolve(&self.tree, path, languages)
    }

    /// Numbered search results for a free-text query.
    #[must_use]
    pub fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        search_results(self.search.as_ref(), query, max_results)
    }
}
