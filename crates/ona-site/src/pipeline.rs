//! Template-chain rendering.
//!
//! Rendering starts from the node's own rendered content and executes each
//! template of the node's chain, innermost first. Every layer receives the
//! previous layer's output as `content`, so outer layouts wrap inner ones.

use std::sync::Arc;

use minijinja::{Value, context};

use crate::context::{NodeObject, SiteObject};
use crate::site::Site;
use crate::template::TemplateError;
use crate::tree::NodeId;

/// Output of a successful render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPage {
    pub body: String,
    /// MIME type of the outermost template.
    pub mime_type: String,
}

/// Error returned when a node cannot be rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The node's own template is not registered.
    #[error("node `{path}` uses missing template `{template}`")]
    MissingTemplate { path: String, template: String },
    /// A template layer failed to execute.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Render a node through its template chain.
pub fn render_node(site: &Arc<Site>, id: NodeId) -> Result<RenderedPage, RenderError> {
    let node = site.tree().get(id);
    let template = node.template();
    if site.templates().get(template).is_none() {
        return Err(RenderError::MissingTemplate {
            path: node.path().to_owned(),
            template: template.to_owned(),
        });
    }

    let chain = site.templates().chain(template)?;
    let node_value = NodeObject::value(site, id);
    let site_value = SiteObject::value(site);
    let mut content = node.render().into_owned();

    for layer in &chain {
        tracing::trace!(path = node.path(), template = %layer.name, "Rendering layer");
        content = site.templates().render_layer(
            &layer.name,
            context! {
                content => Value::from_safe_string(content),
                node => node_value.clone(),
                site => site_value.clone(),
            },
        )?;
    }

    Ok(RenderedPage {
        body: content,
        mime_type: chain
            .last()
            .map(|t| t.mime_type.clone())
            .unwrap_or_default(),
    })
}
