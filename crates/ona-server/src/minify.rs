//! Output minification by MIME type.

use std::sync::LazyLock;

use regex::Regex;

/// Blank lines, and whitespace trailing the final line break.
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*$[\r\n]*|[\r\n]+\s+\z").expect("valid regex"));

/// Error returned by a [`Minifier`].
#[derive(Debug, thiserror::Error)]
pub enum MinifyError {
    /// No minifier handles this MIME type.
    #[error("no minifier for {0}")]
    Unsupported(String),
    /// The input could not be minified.
    #[error("malformed {mime_type} input: {reason}")]
    Malformed {
        mime_type: String,
        reason: &'static str,
    },
}

/// Output minifier keyed by MIME type.
pub trait Minifier: Send + Sync {
    fn minify(&self, mime_type: &str, input: &str) -> Result<String, MinifyError>;
}

/// Minifier for `text/plain` and `text/html`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MimeMinifier;

impl Minifier for MimeMinifier {
    fn minify(&self, mime_type: &str, input: &str) -> Result<String, MinifyError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "text/plain" => Ok(drop_blank_lines(input)),
            "text/html" => minify_html(input).map_err(|reason| MinifyError::Malformed {
                mime_type: essence.clone(),
                reason,
            }),
            _ => Err(MinifyError::Unsupported(essence)),
        }
    }
}

fn drop_blank_lines(input: &str) -> String {
    BLANK_LINES.replace_all(input, "").into_owned()
}

/// Elements whose content is copied through untouched.
const VERBATIM_ELEMENTS: [&str; 4] = ["pre", "textarea", "script", "style"];

/// Placeholder markers; private-use characters never match `\s`.
const HOLD_OPEN: char = '\u{e000}';
const HOLD_CLOSE: char = '\u{e001}';

/// Drop comments (except conditional comments) and blank lines outside of
/// verbatim elements.
fn minify_html(input: &str) -> Result<String, &'static str> {
    let lower = input.to_ascii_lowercase();
    let mut text = String::with_capacity(input.len());
    let mut held = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        text.push_str(&input[pos..start]);

        if lower[start..].starts_with("<!--") {
            let end = lower[start..]
                .find("-->")
                .map(|e| start + e + 3)
                .ok_or("unterminated comment")?;
            if lower[start + 4..].starts_with("[if") {
                text.push_str(&input[start..end]);
            }
            pos = end;
        } else if let Some(element) = verbatim_element(&lower[start + 1..]) {
            let end = closing_tag_end(&lower, start, element);
            text.push(HOLD_OPEN);
            text.push_str(&held.len().to_string());
            text.push(HOLD_CLOSE);
            held.push(&input[start..end]);
            pos = end;
        } else {
            text.push('<');
            pos = start + 1;
        }
    }
    text.push_str(&input[pos..]);

    let mut out = drop_blank_lines(&text);
    for (i, block) in held.into_iter().enumerate() {
        out = out.replacen(&format!("{HOLD_OPEN}{i}{HOLD_CLOSE}"), block, 1);
    }
    Ok(out)
}

/// Verbatim element opened by a lower-cased tag body following `<`.
fn verbatim_element(tag: &str) -> Option<&'static str> {
    VERBATIM_ELEMENTS.into_iter().find(|name| {
        tag.strip_prefix(name).is_some_and(|after| {
            after
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
        })
    })
}

/// End of the closing tag of `element` opened at `start`, or the end of
/// input when it is never closed.
fn closing_tag_end(lower: &str, start: usize, element: &str) -> usize {
    let closing = format!("</{element}");
    lower[start..]
        .find(&closing)
        .map(|c| start + c)
        .and_then(|c| lower[c..].find('>').map(|gt| c + gt + 1))
        .unwrap_or(lower.len())
}
