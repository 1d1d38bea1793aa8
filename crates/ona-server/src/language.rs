//! `Accept-Language` parsing.

use axum::http::HeaderMap;
use axum::http::header::ACCEPT_LANGUAGE;

/// Language tags from all `Accept-Language` headers, lower-cased, in client
/// preference order.
///
/// Entries are ordered by descending quality, keeping header order for
/// equal qualities. Wildcards, `q=0` entries and entries with an unparseable
/// quality are dropped.
pub(crate) fn accepted_languages(headers: &HeaderMap) -> Vec<String> {
    let joined = headers
        .get_all(ACCEPT_LANGUAGE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    parse_accept_language(&joined)
}

fn parse_accept_language(header: &str) -> Vec<String> {
    let mut entries: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim().to_lowercase();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = match parts.find_map(|p| p.trim().strip_prefix("q=")) {
                Some(q) => q.trim().parse::<f32>().ok()?,
                None => 1.0,
            };
            (quality > 0.0).then_some((tag, quality))
        })
        .collect();

    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.into_iter().map(|(tag, _)| tag).collect()
}
