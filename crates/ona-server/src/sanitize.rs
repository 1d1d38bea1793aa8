//! Request path sanitizer.

/// Neutralizes markup in a decoded request path.
pub trait Sanitizer: Send + Sync {
    /// Return the sanitized form of `input`.
    ///
    /// Implementations must be idempotent: sanitizing an already sanitized
    /// value returns it unchanged.
    fn sanitize(&self, input: &str) -> String;
}

/// Characters never allowed to survive sanitization.
const FORBIDDEN: [char; 5] = ['<', '>', '"', '\'', '`'];

/// Removes tag-shaped sequences and markup-significant characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictSanitizer;

impl Sanitizer for StrictSanitizer {
    fn sanitize(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(pos) = rest.find(FORBIDDEN) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            rest = if tail.starts_with('<')
                && let Some(end) = tail.find('>')
            {
                &tail[end + 1..]
            } else {
                &tail[1..]
            };
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clean_input_unchanged() {
        assert_eq!(StrictSanitizer.sanitize("/docs/api v1"), "/docs/api v1");
    }

    #[test]
    fn test_removes_tags() {
        assert_eq!(
            StrictSanitizer.sanitize("/a<script>alert(1)</script>b"),
            "/aalert(1)b"
        );
    }

    #[test]
    fn test_removes_forbidden_characters() {
        assert_eq!(StrictSanitizer.sanitize("/a\"b'c`d>e"), "/abcde");
        assert_eq!(StrictSanitizer.sanitize("/unclosed<tag"), "/unclosedtag");
    }

    #[test]
    fn test_idempotent() {
        for input in ["/a<b>c", "/<<x>>", "/x<y", "/'\"`", "/plain"] {
            let once = StrictSanitizer.sanitize(input);
            assert_eq!(StrictSanitizer.sanitize(&once), once, "{input}");
        }
    }
}
