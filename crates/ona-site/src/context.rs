//! Template context objects.
//!
//! Templates see the resolved node as `node` and navigation helpers as
//! `site`. Both are thin handles (`Arc<Site>` plus an id) resolved lazily,
//! so building a context costs nothing per node.

use std::fmt;
use std::sync::Arc;

use minijinja::value::{Enumerator, Object, Value, from_args};
use minijinja::{Error, ErrorKind, State};

use crate::resolver::{find_node, normalize_path};
use crate::site::Site;
use crate::tree::{NodeId, NodeRef};

/// Default number of search results for `site.search(term)`.
const DEFAULT_SEARCH_RESULTS: usize = 10;

const NODE_ATTRIBUTES: &[&str] = &[
    "name",
    "title",
    "description",
    "path",
    "slug",
    "language",
    "template",
    "navigable",
    "enabled",
    "weight",
    "created",
    "last_modified",
    "engine",
    "redirect_to",
    "application_endpoint",
    "has_children",
    "children",
    "parent",
    "parents",
    "parents_and_self",
    "root",
    "content",
];

/// A content node exposed to templates.
pub struct NodeObject {
    site: Arc<Site>,
    id: NodeId,
}

impl NodeObject {
    /// Wrap a node as a template value.
    #[must_use]
    pub fn value(site: &Arc<Site>, id: NodeId) -> Value {
        Value::from_object(Self {
            site: Arc::clone(site),
            id,
        })
    }

    fn node(&self) -> NodeRef<'_> {
        self.site.tree().get(self.id)
    }

    fn list<'a>(&self, nodes: impl IntoIterator<Item = NodeRef<'a>>) -> Value {
        nodes
            .into_iter()
            .map(|n| Self::value(&self.site, n.id()))
            .collect::<Vec<_>>()
            .into()
    }
}

impl fmt::Debug for NodeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeObject")
            .field("path", &self.node().path())
            .finish()
    }
}

fn optional(value: Option<i64>) -> Value {
    value.map_or(Value::from(()), Value::from)
}

impl Object for NodeObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let node = self.node();
        let data = node.data();
        let value = match key.as_str()? {
            "name" => Value::from(data.name.as_str()),
            "title" => Value::from(data.title.as_str()),
            "description" => Value::from(data.description.as_str()),
            "path" => Value::from(node.path()),
            "slug" => Value::from(data.slug()),
            "language" => Value::from(node.language()),
            "template" => Value::from(node.template()),
            "navigable" => Value::from(node.navigable()),
            "enabled" => Value::from(node.enabled()),
            "weight" => optional(data.weight),
            "created" => optional(data.created),
            "last_modified" => optional(data.last_modified),
            "engine" => Value::from(data.engine.as_str()),
            "redirect_to" => Value::from(data.redirect_to.as_str()),
            "application_endpoint" => Value::from(data.application_endpoint),
            "has_children" => Value::from(node.has_children()),
            "children" => self.list(node.children()),
            "parent" => node
                .parent()
                .map_or(Value::from(()), |p| Self::value(&self.site, p.id())),
            "parents" => self.list(node.parents()),
            "parents_and_self" => self.list(node.parents().into_iter().chain([node])),
            "root" => Self::value(&self.site, node.root().id()),
            "content" => Value::from(data.content.as_str()),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(NODE_ATTRIBUTES)
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "custom_property" => {
                let (key, include_ancestors): (&str, Option<bool>) = from_args(args)?;
                Ok(Value::from(
                    self.node()
                        .custom_property(key, include_ancestors.unwrap_or(false)),
                ))
            }
            "render" => {
                from_args::<()>(args)?;
                Ok(Value::from_safe_string(self.node().render().into_owned()))
            }
            _ => Err(Error::from(ErrorKind::UnknownMethod)),
        }
    }
}

/// Navigation and search helpers exposed to templates as `site`.
pub struct SiteObject {
    site: Arc<Site>,
}

impl SiteObject {
    #[must_use]
    pub fn value(site: &Arc<Site>) -> Value {
        Value::from_object(Self {
            site: Arc::clone(site),
        })
    }

    fn list<'a>(&self, nodes: impl Iterator<Item = NodeRef<'a>>) -> Value {
        nodes
            .map(|n| NodeObject::value(&self.site, n.id()))
            .collect::<Vec<_>>()
            .into()
    }
}

impl fmt::Debug for SiteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteObject").finish_non_exhaustive()
    }
}

impl Object for SiteObject {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "find_by_path" => {
                let (path,): (&str,) = from_args(args)?;
                Ok(find_node(self.site.tree(), &normalize_path(path))
                    .map_or(Value::from(()), |id| NodeObject::value(&self.site, id)))
            }
            "root_nodes" => {
                from_args::<()>(args)?;
                Ok(self.list(self.site.tree().roots()))
            }
            "nodes" => {
                from_args::<()>(args)?;
                Ok(self.list(self.site.tree().nodes()))
            }
            "search" => {
                let (term, max_results): (&str, Option<usize>) = from_args(args)?;
                let results = self
                    .site
                    .search(term, max_results.unwrap_or(DEFAULT_SEARCH_RESULTS));
                Ok(Value::from_serialize(&results))
            }
            "public_file" => {
                let (path,): (&str,) = from_args(args)?;
                let text = self
                    .site
                    .public_files()
                    .get(path)
                    .and_then(|f| f.text())
                    .unwrap_or_default();
                Ok(Value::from_safe_string(text.to_owned()))
            }
            _ => Err(Error::from(ErrorKind::UnknownMethod)),
        }
    }
}
