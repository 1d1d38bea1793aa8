//! Path resolution against the content tree.
//!
//! Resolution tries, in order:
//! 1. an enabled node at exactly the requested path
//! 2. the nearest enabled ancestor path whose node is an application endpoint
//! 3. the nearest enabled ancestor path (served as a redirect)
//! 4. a root node chosen by the client's language preferences (redirect)

use crate::tree::{ContentTree, NodeId};

/// Outcome of a successful resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Node at exactly the requested path.
    Exact(NodeId),
    /// Application endpoint handling a deeper path.
    Endpoint(NodeId),
    /// Enabled ancestor the client should be sent to.
    Fallback(NodeId),
    /// Root node chosen by language negotiation.
    Language(NodeId),
}

impl Resolution {
    #[must_use]
    pub fn node(self) -> NodeId {
        match self {
            Self::Exact(id) | Self::Endpoint(id) | Self::Fallback(id) | Self::Language(id) => id,
        }
    }

    /// Whether the client must be redirected to the node's own path.
    #[must_use]
    pub fn is_redirect(self) -> bool {
        matches!(self, Self::Fallback(_) | Self::Language(_))
    }
}

/// Normalize a lookup path: trimmed, lower-cased, with a leading slash and
/// no trailing slash.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().to_lowercase();
    let path = path.trim_end_matches('/');
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// Resolve `path` using the staged fallback policy.
///
/// `languages` are lower-cased language tags in client preference order.
/// Returns `None` only when nothing matches and there is no enabled root.
#[must_use]
pub fn resolve(tree: &ContentTree, path: &str, languages: &[String]) -> Option<Resolution> {
    let path = normalize_path(path);
    find_node(tree, &path)
        .map(Resolution::Exact)
        .or_else(|| find_endpoint_node(tree, &path).map(Resolution::Endpoint))
        .or_else(|| find_fallback_node(tree, &path).map(Resolution::Fallback))
        .or_else(|| find_language_root(tree, languages).map(Resolution::Language))
}

/// Enabled node at exactly `path`. The first in tree order wins.
#[must_use]
pub fn find_node(tree: &ContentTree, path: &str) -> Option<NodeId> {
    tree.enabled_at(path).next().map(|n| n.id())
}

/// Nearest strict ancestor path with an enabled application endpoint.
#[must_use]
pub fn find_endpoint_node(tree: &ContentTree, path: &str) -> Option<NodeId> {
    ancestor_paths(path).find_map(|p| {
        tree.enabled_at(p)
            .find(|n| n.data().application_endpoint)
            .map(|n| n.id())
    })
}

/// Nearest strict ancestor path with any enabled node.
#[must_use]
pub fn find_fallback_node(tree: &ContentTree, path: &str) -> Option<NodeId> {
    ancestor_paths(path).find_map(|p| find_node(tree, p))
}

/// Root node for the client's language preferences.
///
/// Full tags are tried first, then primary subtags, then the first enabled
/// root in tree order.
#[must_use]
pub fn find_language_root(tree: &ContentTree, languages: &[String]) -> Option<NodeId> {
    let root_with = |language: &str| {
        tree.roots()
            .find(|n| n.enabled() && n.language() == language)
            .map(|n| n.id())
    };

    languages
        .iter()
        .find_map(|tag| root_with(tag.as_str()))
        .or_else(|| {
            languages
                .iter()
                .find_map(|tag| root_with(tag.split('-').next().unwrap_or(tag)))
        })
        .or_else(|| tree.roots().find(|n| n.enabled()).map(|n| n.id()))
}

/// Strict ancestor paths of `path`, nearest first.
///
/// `/a/b/c` yields `/a/b` then `/a`.
fn ancestor_paths(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |p| {
        p.rfind('/').filter(|&i| i > 0).map(|i| &p[..i])
    })
    .skip(1)
}
