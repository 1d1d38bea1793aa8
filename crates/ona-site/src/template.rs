//! Named, parent-chainable templates.
//!
//! Templates are compiled into a shared [`minijinja::Environment`] when they
//! are added, so syntax errors surface at load time. [`TemplateRegistryBuilder::build`]
//! rejects chains that loop or name a missing parent, so rendering can walk
//! a chain without guarding against non-termination.

use std::collections::{HashMap, HashSet};

use minijinja::{AutoEscape, Environment, Value};
use serde::Deserialize;

use crate::node::Scalar;

/// Template definition as read from a YAML file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateDefinition {
    pub parent: Option<Scalar>,
    pub description: Option<Scalar>,
    pub created: Option<Scalar>,
    pub last_modified: Option<Scalar>,
    pub mime_type: Option<Scalar>,
    pub engine: Option<Scalar>,
    pub content: Option<Scalar>,
    pub content_file: Option<Scalar>,
}

/// A named render unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Template {
    /// Lower-cased name given by the loader.
    pub name: String,
    /// Lower-cased name of the enclosing template. Empty ends the chain.
    pub parent: String,
    pub description: String,
    pub created: Option<i64>,
    pub last_modified: Option<i64>,
    pub mime_type: String,
    /// Informational only.
    pub engine: String,
    /// Template source.
    pub content: String,
    /// Content file named by the definition, relative to it.
    pub content_file: Option<String>,
}

impl Template {
    /// Create a template with the given name, parent, MIME type and source.
    #[must_use]
    pub fn new(name: &str, parent: &str, mime_type: &str, content: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            parent: parent.trim().to_lowercase(),
            mime_type: mime_type.to_owned(),
            content: content.to_owned(),
            ..Self::default()
        }
    }

    /// Build a template from its parsed definition.
    #[must_use]
    pub fn from_definition(name: &str, def: TemplateDefinition) -> Self {
        let text = |v: Option<Scalar>| v.map(Scalar::into_text).unwrap_or_default();
        let timestamp = |v: Option<Scalar>| {
            text(v)
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|&t| t != -1)
        };
        let content_file = text(def.content_file);
        Self {
            name: name.trim().to_lowercase(),
            parent: text(def.parent).trim().to_lowercase(),
            description: text(def.description),
            created: timestamp(def.created),
            last_modified: timestamp(def.last_modified),
            mime_type: text(def.mime_type).trim().to_owned(),
            engine: text(def.engine).trim().to_lowercase(),
            content: text(def.content),
            content_file: (!content_file.trim().is_empty()).then_some(content_file),
        }
    }

    /// Whether this template ends its chain.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Error raised while building or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{name}` failed to parse: {source}")]
    Syntax {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("template chain starting at `{name}` revisits `{repeated}`")]
    Cycle { name: String, repeated: String },
    #[error("template `{name}` names missing parent `{parent}`")]
    MissingParent { name: String, parent: String },
    #[error("template `{0}` not found")]
    NotFound(String),
    #[error("template `{name}` failed to render: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Immutable set of compiled templates with validated chains.
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.templates.keys().collect();
        names.sort();
        f.debug_struct("TemplateRegistry")
            .field("templates", &names)
            .finish_non_exhaustive()
    }
}

impl TemplateRegistry {
    /// Look up a template by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(&name.trim().to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The chain starting at `name`, innermost first.
    pub fn chain(&self, name: &str) -> Result<Vec<&Template>, TemplateError> {
        let mut current = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_owned()))?;
        let mut chain = vec![current];
        while !current.is_root() {
            current = self
                .get(&current.parent)
                .ok_or_else(|| TemplateError::NotFound(current.parent.clone()))?;
            chain.push(current);
        }
        Ok(chain)
    }

    /// Execute one template layer with the given context.
    pub fn render_layer(&self, name: &str, context: Value) -> Result<String, TemplateError> {
        let render_error = |source| TemplateError::Render {
            name: name.to_owned(),
            source,
        };
        let compiled = self.env.get_template(name).map_err(render_error)?;
        compiled.render(context).map_err(render_error)
    }
}

/// Builder for [`TemplateRegistry`].
pub struct TemplateRegistryBuilder {
    templates: HashMap<String, Template>,
    env: Environment<'static>,
}

impl Default for TemplateRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Layers embed markup produced by inner layers and node content.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        Self {
            templates: HashMap::new(),
            env,
        }
    }

    /// Compile and add a template.
    ///
    /// A template that fails to parse is not added. Adding a template with
    /// an existing name replaces it.
    pub fn add(&mut self, template: Template) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(template.name.clone(), template.content.clone())
            .map_err(|source| TemplateError::Syntax {
                name: template.name.clone(),
                source,
            })?;
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Validate every chain and freeze the registry.
    pub fn build(self) -> Result<TemplateRegistry, TemplateError> {
        let mut names: Vec<_> = self.templates.keys().collect();
        names.sort();
        for name in names {
            self.check_chain(name)?;
        }
        Ok(TemplateRegistry {
            templates: self.templates,
            env: self.env,
        })
    }

    fn check_chain(&self, start: &str) -> Result<(), TemplateError> {
        let mut seen = HashSet::from([start]);
        let mut current = &self.templates[start];
        while !current.is_root() {
            let parent = current.parent.as_str();
            if !seen.insert(parent) {
                return Err(TemplateError::Cycle {
                    name: start.to_owned(),
                    repeated: parent.to_owned(),
                });
            }
            current = self
                .templates
                .get(parent)
                .ok_or_else(|| TemplateError::MissingParent {
                    name: current.name.clone(),
                    parent: parent.to_owned(),
                })?;
        }
        Ok(())
    }
}
