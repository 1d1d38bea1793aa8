//! Markdown renderer for node content.

use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, html};

use crate::text::escape_html;

/// Markdown to HTML renderer.
///
/// Raw HTML embedded in the markdown source is passed through untouched.
/// Links can be marked non-followable so search engines do not credit the
/// targets of user-authored content.
#[derive(Clone, Debug)]
pub struct MarkdownRenderer {
    gfm: bool,
    nofollow: bool,
}

impl MarkdownRenderer {
    /// Create a new renderer with GFM enabled and `nofollow` links.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gfm: true,
            nofollow: true,
        }
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default. When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Add `rel="nofollow"` to every rendered link (enabled by default).
    #[must_use]
    pub fn with_nofollow(mut self, enabled: bool) -> Self {
        self.nofollow = enabled;
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown text to HTML.
    #[must_use]
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.parser_options());
        let mut output = String::with_capacity(markdown.len() * 3 / 2);

        if self.nofollow {
            html::push_html(&mut output, parser.map(nofollow_link));
        } else {
            html::push_html(&mut output, parser);
        }

        output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace link start/end tags with equivalent raw HTML carrying `rel="nofollow"`.
fn nofollow_link(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        }) => {
            let href = if link_type == LinkType::Email {
                format!("mailto:{dest_url}")
            } else {
                dest_url.into_string()
            };
            let mut tag = format!(r#"<a href="{}""#, escape_html(&href));
            if !title.is_empty() {
                tag.push_str(&format!(r#" title="{}""#, escape_html(&title)));
            }
            tag.push_str(r#" rel="nofollow">"#);
            Event::InlineHtml(CowStr::from(tag))
        }
        Event::End(TagEnd::Link) => Event::InlineHtml(CowStr::Borrowed("</a>")),
        other => other,
    }
}
