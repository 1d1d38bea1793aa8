//! HTML escaping and plain text extraction.

/// Escape the characters that are significant in HTML text and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Elements whose content is never visible text.
const OPAQUE_ELEMENTS: [&str; 2] = ["script", "style"];

/// Reduce rendered markup to its text content.
///
/// Walks the markup and concatenates text segments, dropping tags, comments
/// and the bodies of `<script>` and `<style>` elements. Character references
/// are decoded.
#[must_use]
pub fn plain_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..start]));
        rest = &rest[start..];

        if !opens_markup(rest) {
            out.push('<');
            rest = &rest[1..];
            continue;
        }

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        let Some(end) = rest.find('>') else {
            // Unterminated tag: treat the remainder as text
            out.push_str(&decode_entities(rest));
            return out;
        };
        let tag = tag_name(&rest[1..end]);
        rest = &rest[end + 1..];

        if let Some(opaque) = OPAQUE_ELEMENTS.iter().find(|e| **e == tag) {
            let closing = format!("</{opaque}");
            rest = find_ignore_ascii_case(rest, &closing)
                .and_then(|pos| rest[pos..].find('>').map(|gt| &rest[pos + gt + 1..]))
                .unwrap_or("");
        }
    }

    out.push_str(&decode_entities(rest));
    out
}

/// Whether the `<` at the start of `s` begins a tag, comment or declaration.
///
/// Any other `<` is literal text, as in `1 < 2`.
fn opens_markup(s: &str) -> bool {
    s[1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

/// Lower-cased element name of an opening tag body (empty for closing tags).
fn tag_name(body: &str) -> String {
    if body.starts_with('/') {
        return String::new();
    }
    body.chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Decode named and numeric character references.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));

        if let Some((c, semi)) = decoded {
            out.push(c);
            rest = &rest[semi + 1..];
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
