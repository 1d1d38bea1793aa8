//! Request dispatcher.
//!
//! Every request goes through one fallback handler. The handler checks the
//! method, then runs resolution, rendering and minification on the blocking
//! pool under the request timeout. Panics on that pool surface as a join
//! error and become a 500 for that request only.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};
use ona_site::{HeaderLine, render_node};

use crate::error::RequestError;
use crate::language::accepted_languages;
use crate::minify::MinifyError;
use crate::normalize::{Normalized, normalize};
use crate::state::AppState;

/// Successful outcome of dispatching a request.
#[derive(Debug)]
pub(crate) enum Reply {
    /// 200 with a body.
    Content {
        content_type: String,
        etag: String,
        body: Vec<u8>,
        headers: Vec<HeaderLine>,
    },
    /// 304 for a matching `If-None-Match`.
    NotModified { etag: String },
    /// 303 to an absolute path.
    SeeOther(String),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Content {
                content_type,
                etag,
                body,
                headers,
            } => {
                let mut response = Response::new(Body::from(body));
                let map = response.headers_mut();
                insert_header(map, header::CONTENT_TYPE, &content_type);
                insert_header(map, header::ETAG, &etag);
                for line in headers {
                    append_rule_header(map, &line);
                }
                response
            }
            Self::NotModified { etag } => {
                let mut response = StatusCode::NOT_MODIFIED.into_response();
                insert_header(response.headers_mut(), header::ETAG, &etag);
                response
            }
            Self::SeeOther(location) => {
                let mut response = StatusCode::SEE_OTHER.into_response();
                insert_header(response.headers_mut(), header::LOCATION, &location);
                response
            }
        }
    }
}

fn insert_header(map: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            map.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "Dropping invalid header value"),
    }
}

fn append_rule_header(map: &mut HeaderMap, line: &HeaderLine) {
    let name = HeaderName::from_bytes(line.name.as_bytes());
    let value = HeaderValue::from_str(&line.value);
    if let (Ok(name), Ok(value)) = (name, value) {
        map.append(name, value);
    } else {
        tracing::warn!(header = %line.name, value = %line.value, "Dropping invalid rule header");
    }
}

/// Fallback handler for every request.
pub(crate) async fn handle(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_owned(), |ConnectInfo(addr)| addr.to_string());
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    let result = if method == Method::GET || method == Method::HEAD {
        run_blocking(Arc::clone(&state), uri.clone(), headers).await
    } else {
        Err(RequestError::MethodNotAllowed(method.clone()))
    };

    let mut response = match result {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(%method, %host, %remote, %uri, error = %e, "Request failed");
            } else {
                tracing::warn!(%method, %host, %remote, %uri, error = %e, "Request rejected");
            }
            e.into_response()
        }
    };

    if method == Method::HEAD {
        *response.body_mut() = Body::empty();
    }
    response
}

async fn run_blocking(
    state: Arc<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Reply, RequestError> {
    let limit = state.request_timeout;
    let task = tokio::task::spawn_blocking(move || dispatch(&state, &uri, &headers));
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(RequestError::Panicked(e.to_string())),
        Err(_) => Err(RequestError::Timeout),
    }
}

/// Resolve a GET or HEAD request to a reply.
fn dispatch(state: &AppState, uri: &Uri, headers: &HeaderMap) -> Result<Reply, RequestError> {
    let raw = uri.path();
    if !raw.starts_with('/') {
        return Err(RequestError::BadUrl(uri.to_string()));
    }

    let (key, asset_key) = match normalize(raw, state.sanitizer.as_ref())? {
        Normalized::Redirect(location) => return Ok(Reply::SeeOther(location)),
        Normalized::Canonical { key, asset_key } => (key, asset_key),
    };

    let site = &state.site;
    let rule_headers = || site.header_rules().matching(&key).cloned().collect::<Vec<_>>();

    if let Some(file) = site.public_files().get(&asset_key) {
        let etag = compute_etag(&file.content);
        if not_modified(headers, &etag) {
            return Ok(Reply::NotModified { etag });
        }
        return Ok(Reply::Content {
            content_type: file.mime_type.clone(),
            etag,
            body: file.content.clone(),
            headers: rule_headers(),
        });
    }

    let languages = accepted_languages(headers);
    let resolution = site
        .resolve(&format!("/{key}"), &languages)
        .ok_or(RequestError::NotFound)?;
    let node = site.tree().get(resolution.node());
    if resolution.is_redirect() {
        return Ok(Reply::SeeOther(node.path().to_owned()));
    }
    let target = node.data().redirect_to.trim();
    if !target.is_empty() {
        return Ok(Reply::SeeOther(target.to_owned()));
    }

    let page = render_node(site, node.id())?;
    let body = match state.minifier.minify(&page.mime_type, &page.body) {
        Ok(minified) => minified,
        Err(e @ MinifyError::Unsupported(_)) => {
            tracing::debug!(path = %node.path(), error = %e, "Output not minified");
            page.body
        }
        Err(e) => {
            tracing::warn!(path = %node.path(), error = %e, "Minification failed");
            page.body
        }
    };

    let etag = compute_etag(body.as_bytes());
    if not_modified(headers, &etag) {
        return Ok(Reply::NotModified { etag });
    }
    Ok(Reply::Content {
        content_type: format!("{}; charset=UTF-8", page.mime_type),
        etag,
        body: body.into_bytes(),
        headers: rule_headers(),
    })
}

/// Whether `If-None-Match` contains the fingerprint.
fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(etag))
}

/// Compute a quoted `ETag` from response bytes.
fn compute_etag(content: &[u8]) -> String {
    let hash = Md5::digest(content);
    format!("\"{}\"", hex::encode(hash))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::Request;
    use ona_site::{
        ContentTreeBuilder, HeaderRule, HeaderRules, MemoryIndex, Node, PublicFile, PublicFiles,
        Site, Template, TemplateRegistryBuilder,
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::app::create_router;
    use crate::minify::MimeMinifier;
    use crate::sanitize::{Sanitizer, StrictSanitizer};

    fn node(name: &str, template: Option<&str>) -> Node {
        Node {
            enabled: Some(true),
            template: template.map(str::to_owned),
            ..Node::new(name)
        }
    }

    fn test_site() -> Site {
        let mut tree = ContentTreeBuilder::new();

        let mut en = node("en", Some("page"));
        en.language = Some("en".to_owned());
        en.content = "English home".to_owned();
        let en = tree.add_node(en, None);
        let mut about = node("about", None);
        about.content = "About\n\n\nus".to_owned();
        tree.add_node(about, Some(en));
        let mut old = node("old", None);
        old.redirect_to = "/en/about".to_owned();
        tree.add_node(old, Some(en));

        let mut de = node("de", Some("page"));
        de.language = Some("de".to_owned());
        de.content = "Startseite".to_owned();
        tree.add_node(de, None);

        let mut docs = node("docs", Some("layout"));
        docs.application_endpoint = true;
        docs.content = "Docs app".to_owned();
        let docs = tree.add_node(docs, None);
        tree.add_node(node("guide", None), Some(docs));

        let mut blog = node("blog", Some("page"));
        blog.content = "Blog".to_owned();
        let blog = tree.add_node(blog, None);
        let mut post = node("post-1", None);
        post.content = "First post".to_owned();
        tree.add_node(post, Some(blog));

        let mut cafe = node("café", Some("page"));
        cafe.content = "Coffee".to_owned();
        tree.add_node(cafe, None);

        let mut snippet = node("snippet", Some("layout"));
        snippet.engine = "markdown".to_owned();
        snippet.content = "```\nline one\n\nline three\n```\n".to_owned();
        tree.add_node(snippet, None);

        tree.add_node(node("broken", Some("missing")), None);
        tree.add_node(node("failing", Some("failing")), None);
        tree.add_node(node("slow", Some("slow")), None);

        let mut templates = TemplateRegistryBuilder::new();
        for (name, mime_type, content) in [
            ("page", "text/plain", "{{ content }}\n\n"),
            ("layout", "text/html", "<main>{{ content }}</main><!-- footer -->"),
            ("failing", "text/plain", "{{ no_such_function() }}"),
            (
                "slow",
                "text/plain",
                "{% for i in range(1000) %}{% for j in range(1000) %}{% endfor %}{% endfor %}",
            ),
        ] {
            templates
                .add(Template::new(name, "", mime_type, content))
                .unwrap();
        }

        let mut public = PublicFiles::new();
        public.insert("css/site.css", PublicFile::new(b"body {}".to_vec(), "text/css"));

        let rules = HeaderRules::new(vec![
            HeaderRule::new(
                "docs/**",
                vec![HeaderLine::parse("X-Frame-Options: DENY").unwrap()],
            )
            .unwrap(),
            HeaderRule::new(
                "**",
                vec![HeaderLine::parse("X-Served-By: ona").unwrap()],
            )
            .unwrap(),
        ]);

        Site::new(
            tree.build(),
            templates.build().unwrap(),
            public,
            rules,
            Box::new(MemoryIndex::new()),
        )
    }

    fn router_with(sanitizer: Box<dyn Sanitizer>, request_timeout: Duration) -> Router {
        router_with_hard_timeout(sanitizer, request_timeout, Duration::from_secs(30))
    }

    fn router_with_hard_timeout(
        sanitizer: Box<dyn Sanitizer>,
        request_timeout: Duration,
        hard_timeout: Duration,
    ) -> Router {
        let state = Arc::new(AppState {
            site: Arc::new(test_site()),
            sanitizer,
            minifier: Box::new(MimeMinifier),
            request_timeout,
        });
        create_router(state, hard_timeout)
    }

    fn router() -> Router {
        router_with(Box::new(StrictSanitizer), Duration::from_secs(10))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> Response {
        router.oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn header_value<'a>(response: &'a Response, name: &str) -> &'a str {
        response.headers()[name].to_str().unwrap()
    }

    #[test]
    fn test_compute_etag_format() {
        let etag = compute_etag(b"content");

        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert_eq!(etag.len(), 34);
    }

    #[test]
    fn test_compute_etag_deterministic() {
        assert_eq!(compute_etag(b"a"), compute_etag(b"a"));
        assert_ne!(compute_etag(b"a"), compute_etag(b"b"));
    }

    #[test]
    fn test_not_modified_matches_substring() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("W/\"x\", \"abc\""),
        );

        assert!(not_modified(&headers, "\"abc\""));
        assert!(!not_modified(&headers, "\"abd\""));
        assert!(!not_modified(&HeaderMap::new(), "\"abc\""));
    }

    #[tokio::test]
    async fn test_post_rejected_without_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/%zz")
            .body(Body::empty())
            .unwrap();

        let response = send(router(), request).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_static_asset_etag_and_not_modified() {
        let first = send(router(), get("/CSS/site.css")).await;
        let second = send(router(), get("/css/site.css")).await;
        let etag = header_value(&first, "etag").to_owned();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(header_value(&first, "content-type"), "text/css");
        assert_eq!(header_value(&second, "etag"), etag);
        assert_eq!(body_text(first).await, "body {}");

        let request = Request::builder()
            .uri("/css/site.css")
            .header(header::IF_NONE_MATCH, &etag)
            .body(Body::empty())
            .unwrap();
        let response = send(router(), request).await;

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(header_value(&response, "etag"), etag);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_rendered_page_not_modified() {
        let first = send(router(), get("/en/about")).await;
        let etag = header_value(&first, "etag").to_owned();

        let request = Request::builder()
            .uri("/en/about")
            .header(header::IF_NONE_MATCH, &etag)
            .body(Body::empty())
            .unwrap();
        let response = send(router(), request).await;

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_page_content_type_and_minified_body() {
        let response = send(router(), get("/en/about")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_value(&response, "content-type"),
            "text/plain; charset=UTF-8"
        );
        assert_eq!(body_text(response).await, "About\nus");
    }

    #[tokio::test]
    async fn test_html_comments_removed() {
        let response = send(router(), get("/docs")).await;

        assert_eq!(
            header_value(&response, "content-type"),
            "text/html; charset=UTF-8"
        );
        assert_eq!(body_text(response).await, "<main>Docs app</main>");
    }

    #[tokio::test]
    async fn test_html_code_block_keeps_blank_lines() {
        let response = send(router(), get("/snippet")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<pre><code>line one\n\nline three\n</code></pre>"));
        assert!(body.ends_with("</main>"));
    }

    #[tokio::test]
    async fn test_header_rules_applied_by_key() {
        let docs = send(router(), get("/docs/api/v1")).await;
        let blog = send(router(), get("/blog/post-1")).await;

        assert_eq!(docs.status(), StatusCode::OK);
        assert_eq!(header_value(&docs, "x-frame-options"), "DENY");
        assert_eq!(header_value(&docs, "x-served-by"), "ona");
        assert_eq!(blog.status(), StatusCode::OK);
        assert!(blog.headers().get("x-frame-options").is_none());
        assert_eq!(header_value(&blog, "x-served-by"), "ona");
    }

    #[tokio::test]
    async fn test_header_rules_apply_to_static_assets() {
        let response = send(router(), get("/css/site.css")).await;

        assert_eq!(header_value(&response, "x-served-by"), "ona");
    }

    #[tokio::test]
    async fn test_endpoint_serves_deep_path() {
        let response = send(router(), get("/docs/guide/step/2")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<main>Docs app</main>");
    }

    #[tokio::test]
    async fn test_fallback_ancestor_redirects() {
        let response = send(router(), get("/blog/post-1/comments")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, "location"), "/blog/post-1");
    }

    #[tokio::test]
    async fn test_language_redirect() {
        let request = Request::builder()
            .uri("/nothing-here")
            .header(header::ACCEPT_LANGUAGE, "fr-CA, de")
            .body(Body::empty())
            .unwrap();

        let response = send(router(), request).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, "location"), "/de");
    }

    #[tokio::test]
    async fn test_redirect_to_attribute() {
        let response = send(router(), get("/en/old")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, "location"), "/en/about");
    }

    #[tokio::test]
    async fn test_trailing_slash_redirects() {
        let response = send(router(), get("/en/about/")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, "location"), "/en/about");
    }

    #[tokio::test]
    async fn test_sanitizer_anomaly_redirects() {
        let response = send(router(), get("/en%3Cb%3E")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, "location"), "/en");
    }

    #[tokio::test]
    async fn test_escaped_key_resolves_unicode_name() {
        let response = send(router(), get("/Caf%C3%A9")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Coffee");
    }

    #[tokio::test]
    async fn test_invalid_escape_is_server_error() {
        let response = send(router(), get("/bad%zz")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_template_is_server_error() {
        let response = send(router(), get("/broken")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_template_failure_is_server_error() {
        let response = send(router(), get("/failing")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_head_has_headers_without_body() {
        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/en/about")
            .body(Body::empty())
            .unwrap();

        let response = send(router(), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("etag"));
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_not_found_without_roots() {
        let state = Arc::new(AppState {
            site: Arc::new(Site::new(
                ContentTreeBuilder::new().build(),
                TemplateRegistryBuilder::new().build().unwrap(),
                PublicFiles::new(),
                HeaderRules::default(),
                Box::new(MemoryIndex::new()),
            )),
            sanitizer: Box::new(StrictSanitizer),
            minifier: Box::new(MimeMinifier),
            request_timeout: Duration::from_secs(10),
        });

        let response = send(create_router(state, Duration::from_secs(30)), get("/x")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "not found");
    }

    #[tokio::test]
    async fn test_request_timeout_is_service_unavailable() {
        let router = router_with(Box::new(StrictSanitizer), Duration::from_millis(1));

        let response = send(router, get("/slow")).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_hard_timeout_is_request_timeout() {
        let router = router_with_hard_timeout(
            Box::new(StrictSanitizer),
            Duration::from_secs(10),
            Duration::from_millis(1),
        );

        let response = send(router, get("/slow")).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    struct PanickingSanitizer;

    impl Sanitizer for PanickingSanitizer {
        fn sanitize(&self, path: &str) -> String {
            if path.contains("boom") {
                panic!("sanitizer exploded");
            }
            path.to_owned()
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained_to_request() {
        let router = router_with(Box::new(PanickingSanitizer), Duration::from_secs(10));

        let failed = send(router.clone(), get("/boom")).await;
        let served = send(router, get("/en/about")).await;

        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(served.status(), StatusCode::OK);
    }
}
