//! Full-text search over node content.
//!
//! [`SearchIndex`] is the seam for search backends; [`MemoryIndex`] is a
//! small in-process implementation. [`search_results`] turns ranked hits
//! into the numbered, highlighted results that templates display.

use std::collections::HashMap;
use std::ops::Range;

use ona_renderer::escape_html;
use serde::Serialize;

/// Characters of context kept on each side of a highlighted term.
const FRAGMENT_CONTEXT: usize = 40;

/// A ranked search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// Document id (node path).
    pub id: String,
    pub score: f64,
    /// HTML fragments with matched terms highlighted.
    pub fragments: Vec<String>,
}

/// A numbered search result as exposed to templates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Position in the result list, starting at 1.
    pub index: usize,
    pub url: String,
    /// Score with four decimals.
    pub score: String,
    /// Highlight fragments, each prefixed by a line break.
    pub content: String,
}

/// Search backend.
pub trait SearchIndex: Send + Sync {
    /// Add a document.
    fn index(&mut self, id: &str, text: &str);

    /// Number of indexed documents.
    fn doc_count(&self) -> usize;

    /// Ranked hits for a free-text query, best first.
    fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit>;
}

/// Strip wildcard characters a backend would otherwise interpret.
#[must_use]
pub fn clean_query(query: &str) -> String {
    query.replace(['*', '?'], " ").trim().to_owned()
}

/// Run a query and number the hits `1..=N`.
#[must_use]
pub fn search_results(
    index: &dyn SearchIndex,
    query: &str,
    max_results: usize,
) -> Vec<SearchResult> {
    let query = clean_query(query);
    if query.is_empty() || max_results == 0 {
        return Vec::new();
    }

    index
        .search(&query, max_results)
        .into_iter()
        .take(max_results)
        .enumerate()
        .map(|(i, hit)| SearchResult {
            index: i + 1,
            url: hit.id,
            score: format!("{:.4}", hit.score),
            content: hit
                .fragments
                .iter()
                .map(|f| format!("<br/>{f}"))
                .collect(),
        })
        .collect()
}

#[derive(Debug)]
struct Document {
    id: String,
    text: String,
    /// Lower-cased term to byte ranges of its occurrences in `text`.
    terms: HashMap<String, Vec<Range<usize>>>,
    length: usize,
}

/// In-memory term-frequency index.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: Vec<Document>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchIndex for MemoryIndex {
    fn index(&mut self, id: &str, text: &str) {
        let mut terms: HashMap<String, Vec<Range<usize>>> = HashMap::new();
        let mut length = 0;
        for (term, range) in tokenize(text) {
            terms.entry(term).or_default().push(range);
            length += 1;
        }
        self.documents.push(Document {
            id: id.to_owned(),
            text: text.to_owned(),
            terms,
            length,
        });
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }

    #[allow(clippy::cast_precision_loss)]
    fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        let mut query_terms: Vec<String> = tokenize(query).map(|(t, _)| t).collect();
        query_terms.sort();
        query_terms.dedup();

        let mut hits: Vec<SearchHit> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let matched: Vec<&Vec<Range<usize>>> =
                    query_terms.iter().filter_map(|t| doc.terms.get(t)).collect();
                if matched.is_empty() {
                    return None;
                }
                let frequency: usize = matched.iter().map(|r| r.len()).sum();
                let mut first: Vec<&Range<usize>> =
                    matched.iter().filter_map(|r| r.first()).collect();
                first.sort_by_key(|r| r.start);
                Some(SearchHit {
                    id: doc.id.clone(),
                    score: frequency as f64 / doc.length as f64,
                    fragments: first.into_iter().map(|r| fragment(&doc.text, r)).collect(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(max_results);
        hits
    }
}

/// Lower-cased alphanumeric tokens with their byte ranges.
fn tokenize(text: &str) -> impl Iterator<Item = (String, Range<usize>)> + '_ {
    let mut start = None;
    text.char_indices()
        .chain(std::iter::once((text.len(), ' ')))
        .filter_map(move |(i, c)| {
            if c.is_alphanumeric() && i < text.len() {
                start.get_or_insert(i);
                None
            } else {
                start
                    .take()
                    .map(|s| (text[s..i].to_lowercase(), s..i))
            }
        })
}

/// Highlight `range` in `text` with surrounding context.
fn fragment(text: &str, range: &Range<usize>) -> String {
    let before = &text[..range.start];
    let after = &text[range.end..];

    let before_start = before
        .char_indices()
        .rev()
        .nth(FRAGMENT_CONTEXT - 1)
        .map_or(0, |(i, _)| i);
    let after_end = after
        .char_indices()
        .nth(FRAGMENT_CONTEXT)
        .map_or(after.len(), |(i, _)| i);

    let mut out = String::new();
    if before_start > 0 {
        out.push('…');
    }
    out.push_str(&escape_html(before[before_start..].trim_start()));
    out.push_str("<mark>");
    out.push_str(&escape_html(&text[range.clone()]));
    out.push_str("</mark>");
    out.push_str(&escape_html(after[..after_end].trim_end()));
    if after_end < after.len() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn index(docs: &[(&str, &str)]) -> MemoryIndex {
        let mut index = MemoryIndex::new();
        for (id, text) in docs {
            index.index(id, text);
        }
        index
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<_> = tokenize("Hello, Wörld! x2").collect();
        assert_eq!(
            tokens,
            [
                ("hello".to_owned(), 0..5),
                ("wörld".to_owned(), 7..13),
                ("x2".to_owned(), 15..17),
            ]
        );
    }

    #[test]
    fn test_clean_query_strips_wildcards() {
        assert_eq!(clean_query(" rust* ?"), "rust");
        assert_eq!(clean_query("a?b"), "a b");
    }

    #[test]
    fn test_search_ranks_by_frequency() {
        let index = index(&[
            ("/once", "rust is a language for systems"),
            ("/twice", "rust rust everywhere"),
            ("/none", "python only"),
        ]);

        let hits = index.search("Rust", 10);

        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["/twice", "/once"]);
        assert_eq!(index.doc_count(), 3);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let index = index(&[("/b", "term"), ("/a", "term")]);

        let ids: Vec<_> = index.search("term", 10).into_iter().map(|h| h.id).collect();

        assert_eq!(ids, ["/a", "/b"]);
    }

    #[test]
    fn test_fragment_highlights_and_escapes() {
        let index = index(&[("/p", "use <b> & find the needle here")]);

        let hits = index.search("needle", 1);

        assert_eq!(
            hits[0].fragments,
            ["use &lt;b&gt; &amp; find the <mark>needle</mark> here"]
        );
    }

    #[test]
    fn test_fragment_truncates_long_context() {
        let text = format!("{} needle {}", "a".repeat(100), "b".repeat(100));

        let out = fragment(&text, &(101..107));

        assert!(out.starts_with('…'));
        assert!(out.ends_with('…'));
        assert!(out.contains("<mark>needle</mark>"));
    }

    #[test]
    fn test_search_results_numbered_and_truncated() {
        let index = index(&[
            ("/a", "alpha beta"),
            ("/b", "alpha"),
            ("/c", "alpha gamma delta"),
        ]);

        let results = search_results(&index, "alpha*", 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].url, "/b");
        assert_eq!(results[0].score, "1.0000");
        assert_eq!(results[0].content, "<br/><mark>alpha</mark>");
        assert_eq!(results[1].index, 2);
        assert_eq!(results[1].url, "/a");
        assert_eq!(results[1].score, "0.5000");
    }

    #[test]
    fn test_multiple_fragments_joined_with_line_breaks() {
        let index = index(&[("/a", "alpha and beta")]);

        let results = search_results(&index, "beta alpha", 5);

        assert_eq!(
            results[0].content,
            "<br/><mark>alpha</mark> and beta<br/>alpha and <mark>beta</mark>"
        );
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = index(&[("/a", "anything")]);

        assert!(search_results(&index, "*?", 10).is_empty());
        assert!(search_results(&index, "anything", 0).is_empty());
    }
}
