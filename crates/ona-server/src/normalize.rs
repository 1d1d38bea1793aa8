//! Request path normalization.
//!
//! Turns a raw request path into lookup keys, or into a redirect when the
//! path is not in canonical form:
//!
//! 1. lower-case and strictly percent-decode
//! 2. sanitize; a changed path redirects to its sanitized form
//! 3. collapse slash runs and backslash-slash pairs, strip trailing slashes;
//!    a changed path redirects to the cleaned form

use ona_site::escape_segment;
use percent_encoding::percent_decode_str;

use crate::error::RequestError;
use crate::sanitize::Sanitizer;

/// Result of normalizing a request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Normalized {
    /// Path is canonical.
    Canonical {
        /// Escaped key for node and header-rule lookups (no leading slash).
        key: String,
        /// Decoded key for static asset lookups (no leading slash).
        asset_key: String,
    },
    /// Client must be redirected to this escaped absolute path.
    Redirect(String),
}

/// Normalize a raw (still percent-encoded) request path.
pub(crate) fn normalize(raw: &str, sanitizer: &dyn Sanitizer) -> Result<Normalized, RequestError> {
    let decoded = strict_decode(&raw.to_lowercase())?;

    let sanitized = sanitizer.sanitize(&decoded);
    if sanitized != decoded {
        tracing::warn!(
            path = %decoded,
            sanitized = %sanitized,
            "Request path changed by sanitizer"
        );
        return Ok(Normalized::Redirect(escape_path(&canonicalize(&sanitized))));
    }

    let canonical = canonicalize(&decoded);
    if canonical != decoded {
        return Ok(Normalized::Redirect(escape_path(&canonical)));
    }

    let asset_key = canonical.trim_start_matches('/').to_owned();
    let key = lookup_key(&asset_key);
    Ok(Normalized::Canonical { key, asset_key })
}

/// Percent-decode, rejecting malformed escapes and non-UTF-8 results.
fn strict_decode(path: &str) -> Result<String, RequestError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|&b| b == b'%') {
        let pos = i + offset;
        let valid = bytes
            .get(pos + 1..pos + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(RequestError::Decode(format!("invalid escape at byte {pos}")));
        }
        i = pos + 3;
    }

    percent_decode_str(path)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| RequestError::Decode(e.to_string()))
}

/// Collapse slash runs and `\`/`/` pairs into one slash and strip trailing
/// slashes. The result always starts with `/`.
fn canonicalize(path: &str) -> String {
    let mut path = path.to_owned();
    loop {
        let collapsed = path
            .replace("/\\", "/")
            .replace("\\/", "/")
            .replace("//", "/");
        if collapsed == path {
            break;
        }
        path = collapsed;
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// Escape each segment of a decoded key.
fn lookup_key(decoded: &str) -> String {
    if decoded.is_empty() {
        return String::new();
    }
    decoded
        .split('/')
        .map(escape_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Escaped absolute form of a decoded path.
fn escape_path(decoded: &str) -> String {
    format!("/{}", lookup_key(decoded.trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sanitize::StrictSanitizer;

    fn run(raw: &str) -> Normalized {
        normalize(raw, &StrictSanitizer).unwrap()
    }

    fn canonical(key: &str, asset_key: &str) -> Normalized {
        Normalized::Canonical {
            key: key.to_owned(),
            asset_key: asset_key.to_owned(),
        }
    }

    #[test]
    fn test_canonical_paths() {
        assert_eq!(run("/"), canonical("", ""));
        assert_eq!(run("/Docs/API"), canonical("docs/api", "docs/api"));
        assert_eq!(run("/caf%C3%A9"), canonical("caf%c3%a9", "café"));
        assert_eq!(run("/About%20Us"), canonical("about%20us", "about us"));
    }

    #[test]
    fn test_trailing_slash_redirects() {
        assert_eq!(run("/docs/"), Normalized::Redirect("/docs".to_owned()));
        assert_eq!(run("/docs///"), Normalized::Redirect("/docs".to_owned()));
    }

    #[test]
    fn test_backslash_slash_collapsed() {
        assert_eq!(run("/\\/evil.com"), Normalized::Redirect("/evil.com".to_owned()));
        assert_eq!(run("/a%5C/b"), Normalized::Redirect("/a/b".to_owned()));
    }

    #[test]
    fn test_protocol_relative_never_emitted() {
        assert_eq!(run("//evil.com/"), Normalized::Redirect("/evil.com".to_owned()));
        assert_eq!(run("//evil.com"), Normalized::Redirect("/evil.com".to_owned()));
    }

    #[test]
    fn test_sanitizer_anomaly_redirects() {
        assert_eq!(
            run("/docs%3Cscript%3Ex%3C/script%3E"),
            Normalized::Redirect("/docsx".to_owned())
        );
        assert_eq!(run("/a%22b"), Normalized::Redirect("/ab".to_owned()));
    }

    #[test]
    fn test_redirect_target_is_stable() {
        let Normalized::Redirect(target) = run("/Caf%C3%A9%3Cb%3E/") else {
            panic!("expected redirect");
        };

        assert_eq!(target, "/caf%c3%a9");
        assert_eq!(run(&target), canonical("caf%c3%a9", "café"));
    }

    #[test]
    fn test_invalid_escape_fails() {
        assert!(matches!(
            normalize("/bad%zz", &StrictSanitizer),
            Err(RequestError::Decode(_))
        ));
        assert!(matches!(
            normalize("/short%4", &StrictSanitizer),
            Err(RequestError::Decode(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        assert!(matches!(
            normalize("/%ff%fe", &StrictSanitizer),
            Err(RequestError::Decode(_))
        ));
    }
}
