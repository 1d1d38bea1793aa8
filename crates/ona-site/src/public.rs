//! Static assets served from a flat namespace.

use std::collections::HashMap;
use std::path::Path;

/// A static asset: raw bytes plus MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicFile {
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl PublicFile {
    #[must_use]
    pub fn new(content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
        }
    }

    /// Create an asset whose MIME type is guessed from the file extension.
    #[must_use]
    pub fn from_path(path: &Path, content: Vec<u8>) -> Self {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Self::new(content, mime.essence_str())
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Static assets keyed by lower-cased relative path (no leading slash).
#[derive(Clone, Debug, Default)]
pub struct PublicFiles {
    files: HashMap<String, PublicFile>,
}

impl PublicFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. The key is lower-cased and stripped of leading slashes.
    pub fn insert(&mut self, key: &str, file: PublicFile) {
        self.files.insert(Self::normalize(key), file);
    }

    /// Look up an asset by relative path (case-insensitive).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PublicFile> {
        self.files.get(&Self::normalize(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn normalize(key: &str) -> String {
        key.trim_start_matches('/').to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_guesses_mime() {
        assert_eq!(
            PublicFile::from_path(Path::new("css/site.css"), Vec::new()).mime_type,
            "text/css"
        );
        assert_eq!(
            PublicFile::from_path(Path::new("logo.PNG"), Vec::new()).mime_type,
            "image/png"
        );
        assert_eq!(
            PublicFile::from_path(Path::new("blob"), Vec::new()).mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut files = PublicFiles::new();
        files.insert("CSS/Site.css", PublicFile::new(b"body{}".to_vec(), "text/css"));

        assert!(files.get("css/site.css").is_some());
        assert!(files.get("/css/SITE.css").is_some());
        assert!(files.get("site.css").is_none());
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_text_requires_utf8() {
        assert_eq!(PublicFile::new(b"hi".to_vec(), "text/plain").text(), Some("hi"));
        assert_eq!(PublicFile::new(vec![0xff, 0xfe], "image/x").text(), None);
    }
}
