//! Content tree with index-based parent/child links.
//!
//! # Architecture
//!
//! Nodes are stored in a flat `Vec<Node>` with parent/children relationships
//! tracked by [`NodeId`] indices. This provides:
//! - O(1) path lookups via a path index over enabled nodes
//! - O(d) ancestor walks for inherited attributes, where d is the node depth
//! - no reference cycles between parents and children
//!
//! The tree is immutable once built, so node paths are computed once in
//! [`ContentTreeBuilder::build`].

use std::borrow::Cow;
use std::collections::HashMap;

use crate::node::Node;

/// Stable index of a node in its [`ContentTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the tree's storage.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Immutable tree of content nodes.
#[derive(Debug)]
pub struct ContentTree {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    roots: Vec<NodeId>,
    /// Depth-first pre-order over roots and children.
    order: Vec<NodeId>,
    paths: Vec<String>,
    /// Enabled nodes by path, in tree order.
    enabled_index: HashMap<String, Vec<NodeId>>,
}

impl ContentTree {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node with navigation helpers.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.0 < self.nodes.len(), "node id out of range");
        NodeRef { tree: self, id }
    }

    /// All nodes in tree order (depth-first, siblings in sorted order).
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.order.iter().map(|&id| NodeRef { tree: self, id })
    }

    /// Nodes without a parent, in load order.
    pub fn roots(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.roots.iter().map(|&id| NodeRef { tree: self, id })
    }

    /// Enabled nodes whose path equals `path`, in tree order.
    pub fn enabled_at(&self, path: &str) -> impl Iterator<Item = NodeRef<'_>> {
        self.enabled_index
            .get(path)
            .into_iter()
            .flatten()
            .map(|&id| NodeRef { tree: self, id })
    }

    /// Resolve an inherited attribute by walking from `id` towards the root.
    ///
    /// Returns the value from the nearest node (starting with `id` itself)
    /// for which `attr` yields `Some`.
    pub fn resolve_attribute<'a, T>(
        &'a self,
        id: NodeId,
        attr: impl Fn(&'a Node) -> Option<T>,
    ) -> Option<T> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = attr(&self.nodes[node.0]) {
                return Some(value);
            }
            current = self.parents[node.0];
        }
        None
    }
}

/// Borrowed view of one node in a [`ContentTree`].
#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'a> {
    tree: &'a ContentTree,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }

    /// Own (non-inherited) node data.
    #[must_use]
    pub fn data(self) -> &'a Node {
        &self.tree.nodes[self.id.0]
    }

    #[must_use]
    pub fn name(self) -> &'a str {
        &self.data().name
    }

    /// Absolute, lower-cased, percent-escaped path.
    #[must_use]
    pub fn path(self) -> &'a str {
        &self.tree.paths[self.id.0]
    }

    #[must_use]
    pub fn parent(self) -> Option<Self> {
        self.tree.parents[self.id.0].map(|id| Self {
            tree: self.tree,
            id,
        })
    }

    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let tree = self.tree;
        tree.children[self.id.0]
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    #[must_use]
    pub fn has_children(self) -> bool {
        !self.tree.children[self.id.0].is_empty()
    }

    /// Ancestors, outermost first, excluding this node.
    #[must_use]
    pub fn parents(self) -> Vec<Self> {
        let mut ancestors: Vec<_> = std::iter::successors(self.parent(), |n| n.parent()).collect();
        ancestors.reverse();
        ancestors
    }

    /// Topmost ancestor, or this node if it has no parent.
    #[must_use]
    pub fn root(self) -> Self {
        std::iter::successors(Some(self), |n| n.parent())
            .last()
            .unwrap_or(self)
    }

    /// Inherited language, empty when no ancestor sets one.
    #[must_use]
    pub fn language(self) -> &'a str {
        self.tree
            .resolve_attribute(self.id, |n| n.language.as_deref())
            .unwrap_or_default()
    }

    /// Inherited template name, empty when no ancestor sets one.
    #[must_use]
    pub fn template(self) -> &'a str {
        self.tree
            .resolve_attribute(self.id, |n| n.template.as_deref())
            .unwrap_or_default()
    }

    /// Inherited navigable flag, false when no ancestor sets one.
    #[must_use]
    pub fn navigable(self) -> bool {
        self.tree
            .resolve_attribute(self.id, |n| n.navigable)
            .unwrap_or(false)
    }

    /// Inherited enabled flag, false when no ancestor sets one.
    #[must_use]
    pub fn enabled(self) -> bool {
        self.tree
            .resolve_attribute(self.id, |n| n.enabled)
            .unwrap_or(false)
    }

    /// Look up a custom property, optionally falling through to ancestors.
    ///
    /// Returns an empty string when the key is not found.
    #[must_use]
    pub fn custom_property(self, key: &str, include_ancestors: bool) -> &'a str {
        if include_ancestors {
            self.tree
                .resolve_attribute(self.id, |n| n.property(key))
                .unwrap_or_default()
        } else {
            self.data().property(key).unwrap_or_default()
        }
    }

    /// Node content transformed by its render engine.
    #[must_use]
    pub fn render(self) -> Cow<'a, str> {
        let node = self.data();
        node.render_engine().render(&node.content)
    }
}

/// Builder for [`ContentTree`].
///
/// Siblings keep the order in which they are added, so callers sort each
/// directory level before adding it.
#[derive(Debug, Default)]
pub struct ContentTreeBuilder {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    roots: Vec<NodeId>,
}

impl ContentTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` (or as a root) and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not returned by this builder.
    pub fn add_node(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.parents.push(parent);
        self.children.push(Vec::new());
        match parent {
            Some(parent) => self.children[parent.0].push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Freeze the builder into a [`ContentTree`].
    #[must_use]
    pub fn build(self) -> ContentTree {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children[id.0].iter().rev());
        }

        let mut paths = vec![String::new(); self.nodes.len()];
        for &id in &order {
            let prefix = self.parents[id.0].map_or("", |p| paths[p.0].as_str());
            let path = format!("{prefix}/{}", self.nodes[id.0].slug());
            paths[id.0] = path;
        }

        let mut tree = ContentTree {
            nodes: self.nodes,
            parents: self.parents,
            children: self.children,
            roots: self.roots,
            order,
            paths,
            enabled_index: HashMap::new(),
        };

        let mut enabled_index: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in tree.nodes().filter(|n| n.enabled()) {
            enabled_index
                .entry(node.path().to_owned())
                .or_default()
                .push(node.id());
        }
        tree.enabled_index = enabled_index;
        tree
    }
}
