//! Site loading from a directory.
//!
//! Provides [`SiteLoader`] for building a [`Site`] from a site directory:
//!
//! ```text
//! www/
//! ├── http-headers.yaml   header rules
//! ├── nodes/              one YAML file per node
//! │   ├── en.yaml
//! │   └── en/             children of `en`
//! │       └── about.yaml
//! ├── public/             static assets
//! └── templates/          one YAML file per template
//!     └── layout.yaml
//! ```
//!
//! Unreadable or unparseable node, template and asset files are logged and
//! skipped. Template chain errors and an empty node set abort loading.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::headers::{HeaderLine, HeaderRule, HeaderRuleDefinition, HeaderRules};
use crate::node::{Node, NodeDefinition, sibling_order};
use crate::public::{PublicFile, PublicFiles};
use crate::search::MemoryIndex;
use crate::site::Site;
use crate::template::{
    Template, TemplateDefinition, TemplateError, TemplateRegistry, TemplateRegistryBuilder,
};
use crate::tree::{ContentTree, ContentTreeBuilder, NodeId};

const NODES_DIR: &str = "nodes";
const TEMPLATES_DIR: &str = "templates";
const PUBLIC_DIR: &str = "public";
const HEADERS_FILE: &str = "http-headers.yaml";

/// Error returned when a site cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("no nodes found in {}", .0.display())]
    NoNodes(PathBuf),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Loads a [`Site`] from a site directory.
#[derive(Clone, Debug)]
pub struct SiteLoader {
    root: PathBuf,
}

impl SiteLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load everything and index enabled nodes for search.
    pub fn load(&self) -> Result<Site, LoadError> {
        let start = Instant::now();

        let header_rules = self.load_header_rules()?;
        tracing::info!(count = header_rules.len(), "Loaded header rules");

        let public_files = self.load_public_files()?;
        tracing::info!(count = public_files.len(), "Loaded public files");

        let templates = self.load_templates()?;
        tracing::info!(count = templates.len(), "Loaded templates");

        let tree = self.load_nodes();
        if tree.is_empty() {
            return Err(LoadError::NoNodes(self.root.join(NODES_DIR)));
        }
        tracing::info!(count = tree.len(), "Loaded nodes");

        let site = Site::new(
            tree,
            templates,
            public_files,
            header_rules,
            Box::new(MemoryIndex::new()),
        );
        tracing::info!(
            documents = site.search_index().doc_count(),
            elapsed_ms = elapsed_ms(start),
            "Site loaded"
        );
        Ok(site)
    }

    fn load_header_rules(&self) -> Result<HeaderRules, LoadError> {
        let path = self.root.join(HEADERS_FILE);
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "No header rules file");
            return Ok(HeaderRules::default());
        }

        let definitions: Vec<HeaderRuleDefinition> = read_yaml(&path)?.unwrap_or_default();
        let rules = definitions
            .into_iter()
            .filter_map(|def| {
                let headers = def
                    .headers
                    .iter()
                    .filter_map(|line| {
                        let parsed = HeaderLine::parse(line);
                        if parsed.is_none() {
                            tracing::warn!(
                                expression = %def.expression,
                                line = %line,
                                "Ignoring malformed header line"
                            );
                        }
                        parsed
                    })
                    .collect();
                HeaderRule::new(&def.expression, headers)
                    .inspect_err(|e| {
                        tracing::warn!(
                            expression = %def.expression,
                            error = %e,
                            "Ignoring invalid header expression"
                        );
                    })
                    .ok()
            })
            .collect();
        Ok(HeaderRules::new(rules))
    }

    fn load_public_files(&self) -> Result<PublicFiles, LoadError> {
        let dir = self.root.join(PUBLIC_DIR);
        let mut files = PublicFiles::new();
        if !dir.is_dir() {
            tracing::warn!(path = %dir.display(), "No public directory");
            return Ok(files);
        }

        for path in walk_files(&dir)? {
            match std::fs::read(&path) {
                Ok(content) => {
                    let key = relative_key(&dir, &path);
                    files.insert(&key, PublicFile::from_path(&path, content));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable public file"
                    );
                }
            }
        }
        Ok(files)
    }

    fn load_templates(&self) -> Result<TemplateRegistry, LoadError> {
        let dir = self.root.join(TEMPLATES_DIR);
        let mut builder = TemplateRegistryBuilder::new();
        if !dir.is_dir() {
            tracing::warn!(path = %dir.display(), "No templates directory");
            return Ok(builder.build()?);
        }

        for path in walk_files(&dir)?.into_iter().filter(|p| is_yaml(p)) {
            let name = relative_key(&dir, &path.with_extension(""));
            let template = match read_definition::<TemplateDefinition>(&path) {
                Ok(def) => Template::from_definition(&name, def),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping template");
                    continue;
                }
            };
            let loaded =
                with_content_file(&path, template, |t| &mut t.content_file, |t| &mut t.content);
            let template = match loaded {
                Ok(template) => template,
                Err(e) => {
                    tracing::warn!(template = %name, error = %e, "Skipping template");
                    continue;
                }
            };
            if let Err(e) = builder.add(template) {
                tracing::warn!(error = %e, "Skipping template");
            }
        }
        Ok(builder.build()?)
    }

    fn load_nodes(&self) -> ContentTree {
        let dir = self.root.join(NODES_DIR);
        let mut builder = ContentTreeBuilder::new();
        if dir.is_dir() {
            load_level(&dir, None, &mut builder);
        }
        builder.build()
    }
}

/// Load one directory level of nodes, sorted, then recurse into children.
///
/// An unreadable directory is logged and contributes no nodes.
fn load_level(dir: &Path, parent: Option<NodeId>, builder: &mut ContentTreeBuilder) {
    let paths = match read_dir_sorted(dir) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping node directory");
            return;
        }
    };

    let mut siblings = Vec::new();
    for path in paths {
        if !path.is_file() || !is_yaml(&path) {
            continue;
        }
        match load_node(&path) {
            Ok(node) => siblings.push((node, path)),
            Err(e) => tracing::warn!(error = %e, "Skipping node"),
        }
    }
    siblings.sort_by(|(a, _), (b, _)| sibling_order(a, b));

    for (node, path) in siblings {
        let id = builder.add_node(node, parent);
        let children = path.with_extension("");
        if children.is_dir() {
            load_level(&children, Some(id), builder);
        }
    }
}

fn load_node(path: &Path) -> Result<Node, LoadError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let node = Node::from_definition(name, read_definition::<NodeDefinition>(path)?);
    with_content_file(path, node, |n| &mut n.content_file, |n| &mut n.content)
}

/// Replace inline content with the named content file, if any.
///
/// The content file path is relative to the definition file.
fn with_content_file<T>(
    definition: &Path,
    mut item: T,
    content_file: impl Fn(&mut T) -> &mut Option<String>,
    content: impl Fn(&mut T) -> &mut String,
) -> Result<T, LoadError> {
    if let Some(file) = content_file(&mut item).clone() {
        let path = definition
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(file.trim());
        *content(&mut item) = std::fs::read_to_string(&path).map_err(io_error(&path))?;
    }
    Ok(item)
}

/// Read a definition file. An empty file is an all-default definition.
fn read_definition<T: DeserializeOwned + Default>(path: &Path) -> Result<T, LoadError> {
    Ok(read_yaml(path)?.unwrap_or_default())
}

/// Parse a YAML file, returning `None` for an empty document.
fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&text)
        .map(Some)
        .map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Directory entries sorted by file name.
fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut paths = std::fs::read_dir(dir)
        .map_err(io_error(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error(dir))?;
    paths.sort();
    Ok(paths)
}

/// All files below `dir`, depth-first in file name order.
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for path in read_dir_sorted(dir)? {
        if path.is_dir() {
            files.extend(walk_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Lower-cased, slash-separated path of `path` relative to `base`.
fn relative_key(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .to_lowercase()
}
