//! Content render engine selection.

use std::borrow::Cow;

use crate::MarkdownRenderer;

/// Strategy used to turn a node's raw content into markup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderEngine {
    /// Content is already markup and is returned unchanged.
    #[default]
    PassThrough,
    /// Content is markdown, rendered with raw HTML allowed and `nofollow` links.
    Markdown,
}

impl RenderEngine {
    /// Select the engine for an engine name (case-insensitive, surrounding whitespace ignored).
    ///
    /// Unknown names and the empty string select [`RenderEngine::PassThrough`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("markdown") {
            Self::Markdown
        } else {
            Self::PassThrough
        }
    }

    /// Render content with this engine.
    #[must_use]
    pub fn render<'a>(&self, content: &'a str) -> Cow<'a, str> {
        match self {
            Self::PassThrough => Cow::Borrowed(content),
            Self::Markdown => Cow::Owned(MarkdownRenderer::new().render(content)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(RenderEngine::from_name("markdown"), RenderEngine::Markdown);
        assert_eq!(RenderEngine::from_name(" Markdown "), RenderEngine::Markdown);
        assert_eq!(RenderEngine::from_name(""), RenderEngine::PassThrough);
        assert_eq!(RenderEngine::from_name("textile"), RenderEngine::PassThrough);
    }

    #[test]
    fn test_pass_through_returns_content_unmodified() {
        let content = "# not a heading <b>raw</b>";
        let rendered = RenderEngine::PassThrough.render(content);
        assert!(matches!(rendered, Cow::Borrowed(_)));
        assert_eq!(rendered, content);
    }

    #[test]
    fn test_markdown_renders_html() {
        let rendered = RenderEngine::Markdown.render("# Heading");
        assert_eq!(rendered, "<h1>Heading</h1>\n");
    }
}
