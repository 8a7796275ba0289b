use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCEPT_RANGES, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_MATCH,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, IF_UNMODIFIED_SINCE, LAST_MODIFIED, LOCATION,
    RANGE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::http_date;
use crate::path::storage_key;
use crate::store::{dir_prefix, ByteRange, Entry, ObjectStore, StoreError};

const INDEX_PAGE: &str = "index.html";

const PATH_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const SEGMENT_ENCODE: &AsciiSet = &PATH_ENCODE.add(b'/');

/// Serves bucket objects the way a static file server serves a directory tree.
pub struct FileService {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

/// Per-request view of what is being served.
#[derive(Debug)]
struct RequestContext {
    /// Decoded, cleaned request path (always starts with `/`).
    path: String,
    key: String,
}

impl FileService {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new().fallback(serve).with_state(self)
    }

    async fn handle(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Response {
        if method != Method::GET && method != Method::HEAD {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                [(ALLOW, HeaderValue::from_static("GET, HEAD"))],
                "405 method not allowed\n",
            )
                .into_response();
        }

        let decoded = match percent_decode_str(uri.path()).decode_utf8() {
            Ok(p) => p,
            Err(_) => return (StatusCode::BAD_REQUEST, "invalid URL path\n").into_response(),
        };
        if decoded.split('/').any(|segment| segment == "..") {
            return (StatusCode::BAD_REQUEST, "invalid URL path\n").into_response();
        }

        let path = clean_path(&decoded);
        if let Some(dir) = path.strip_suffix(INDEX_PAGE).filter(|d| d.ends_with('/')) {
            return redirect(dir, uri.query());
        }

        // Files and directories share a key; the trailing slash only picks
        // which form is canonical.
        let lookup = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path.as_str()
        };
        let ctx = RequestContext {
            key: storage_key(&self.key_prefix, lookup),
            path: path.clone(),
        };
        debug!("Serving {} from key {:?}", ctx.path, ctx.key);

        let entry = match self.store.stat(&ctx.key).await {
            Ok(entry) => entry,
            Err(e) => return store_error(e),
        };

        if !entry.is_dir() {
            if ctx.path.ends_with('/') {
                return redirect(ctx.path.trim_end_matches('/'), uri.query());
            }
            return self.serve_file(method, headers, &ctx.key, &entry).await;
        }

        if !ctx.path.ends_with('/') {
            return redirect(&format!("{}/", ctx.path), uri.query());
        }

        let index_key = format!("{}{}", dir_prefix(&ctx.key), INDEX_PAGE);
        match self.store.stat(&index_key).await {
            Ok(index) if !index.is_dir() => {
                self.serve_file(method, headers, &index_key, &index).await
            }
            Ok(_) | Err(StoreError::NotFound(_)) => self.serve_listing(method, &ctx).await,
            Err(e) => store_error(e),
        }
    }

    async fn serve_file(
        &self,
        method: &Method,
        headers: &HeaderMap,
        key: &str,
        entry: &Entry,
    ) -> Response {
        let modified = entry.modified.map(truncate_to_seconds);

        let mut response_headers = HeaderMap::new();
        response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Some(at) = modified {
            insert_header(&mut response_headers, LAST_MODIFIED, &http_date::format(at));
        }
        if let Some(etag) = &entry.etag {
            insert_header(&mut response_headers, ETAG, etag);
        }

        match check_preconditions(headers, entry.etag.as_deref(), modified) {
            Precondition::Proceed => {}
            Precondition::Failed => {
                return (StatusCode::PRECONDITION_FAILED, response_headers).into_response();
            }
            Precondition::NotModified => {
                return (StatusCode::NOT_MODIFIED, response_headers).into_response();
            }
        }

        let content_type = mime_guess::from_path(key)
            .first()
            .map(|m| m.essence_str().to_string())
            .or_else(|| entry.content_type.clone())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        insert_header(&mut response_headers, CONTENT_TYPE, &content_type);

        let range = match headers.get(RANGE).and_then(|v| v.to_str().ok()) {
            Some(spec) if if_range_allows(headers, entry.etag.as_deref(), modified) => {
                match parse_range(spec, entry.size) {
                    Ok(range) => range,
                    Err(()) => {
                        insert_header(
                            &mut response_headers,
                            CONTENT_RANGE,
                            &format!("bytes */{}", entry.size),
                        );
                        return (StatusCode::RANGE_NOT_SATISFIABLE, response_headers)
                            .into_response();
                    }
                }
            }
            _ => None,
        };

        let (status, length) = match range {
            Some(r) => {
                insert_header(
                    &mut response_headers,
                    CONTENT_RANGE,
                    &format!("bytes {}-{}/{}", r.start, r.end, entry.size),
                );
                (StatusCode::PARTIAL_CONTENT, r.len())
            }
            None => (StatusCode::OK, entry.size),
        };
        insert_header(&mut response_headers, CONTENT_LENGTH, &length.to_string());

        if method == Method::HEAD {
            return (status, response_headers, Body::empty()).into_response();
        }

        match self.store.read(key, range).await {
            Ok(bytes) => {
                // The object may have changed size since the stat.
                insert_header(&mut response_headers, CONTENT_LENGTH, &bytes.len().to_string());
                (status, response_headers, Body::from(bytes)).into_response()
            }
            Err(e) => store_error(e),
        }
    }

    async fn serve_listing(&self, method: &Method, ctx: &RequestContext) -> Response {
        let mut entries = match self.store.list(&ctx.key).await {
            Ok(entries) => entries,
            Err(e) => return store_error(e),
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut body = String::from(
            "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
        );
        for entry in &entries {
            let name = if entry.is_dir() {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            };
            // "./" keeps names such as "javascript:x" from reading as a scheme.
            let href = format!(
                "./{}{}",
                utf8_percent_encode(&entry.name, SEGMENT_ENCODE),
                if entry.is_dir() { "/" } else { "" }
            );
            body.push_str(&format!(
                "<a href=\"{}\">{}</a>\n",
                html_escape::encode_double_quoted_attribute(&href),
                html_escape::encode_text(&name)
            ));
        }
        body.push_str("</pre>\n");

        let headers = [(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )];
        if method == Method::HEAD {
            (StatusCode::OK, headers).into_response()
        } else {
            (StatusCode::OK, headers, body).into_response()
        }
    }
}

async fn serve(
    State(files): State<Arc<FileService>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    files.handle(&method, &uri, &headers).await
}

/// Collapse empty and `.` segments; keeps a trailing `/`.
fn clean_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    let mut cleaned = format!("/{}", segments.join("/"));
    if path.ends_with('/') && cleaned != "/" {
        cleaned.push('/');
    }
    cleaned
}

fn redirect(path: &str, query: Option<&str>) -> Response {
    let mut location = utf8_percent_encode(path, PATH_ENCODE).to_string();
    if let Some(q) = query {
        location.push('?');
        location.push_str(q);
    }

    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid URL path\n").into_response(),
    }
}

fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "404 page not found\n").into_response(),
        StoreError::Forbidden(key) => {
            debug!("Access denied for {}", key);
            (StatusCode::FORBIDDEN, "403 Forbidden\n").into_response()
        }
        StoreError::Backend(msg) => {
            error!("Storage read failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "500 Internal Server Error\n",
            )
                .into_response()
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: axum::http::HeaderName, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}

fn truncate_to_seconds(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(0).unwrap_or(at)
}

#[derive(Debug, PartialEq, Eq)]
enum Precondition {
    Proceed,
    NotModified,
    Failed,
}

fn header_str<'a>(headers: &'a HeaderMap, name: axum::http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn check_preconditions(
    headers: &HeaderMap,
    etag: Option<&str>,
    modified: Option<OffsetDateTime>,
) -> Precondition {
    if let Some(list) = header_str(headers, IF_MATCH) {
        if !etag_list_matches(list, etag, true) {
            return Precondition::Failed;
        }
    } else if let (Some(since), Some(at)) = (
        header_str(headers, IF_UNMODIFIED_SINCE).and_then(http_date::parse),
        modified,
    ) {
        if at > since {
            return Precondition::Failed;
        }
    }

    if let Some(list) = header_str(headers, IF_NONE_MATCH) {
        if etag_list_matches(list, etag, false) {
            return Precondition::NotModified;
        }
    } else if let (Some(since), Some(at)) = (
        header_str(headers, IF_MODIFIED_SINCE).and_then(http_date::parse),
        modified,
    ) {
        if at <= since {
            return Precondition::NotModified;
        }
    }

    Precondition::Proceed
}

fn if_range_allows(headers: &HeaderMap, etag: Option<&str>, modified: Option<OffsetDateTime>) -> bool {
    let Some(value) = header_str(headers, IF_RANGE) else {
        return true;
    };
    let value = value.trim();
    if value.starts_with('"') || value.starts_with("W/") {
        return etag_list_matches(value, etag, true);
    }
    match (http_date::parse(value), modified) {
        (Some(date), Some(at)) => date == at,
        _ => false,
    }
}

fn etag_list_matches(list: &str, etag: Option<&str>, strong: bool) -> bool {
    let list = list.trim();
    if list == "*" {
        return etag.is_some();
    }
    let Some(etag) = etag else {
        return false;
    };

    let current_weak = etag.starts_with("W/");
    let current = etag.trim_start_matches("W/");
    list.split(',').map(str::trim).any(|candidate| {
        let weak = candidate.starts_with("W/");
        if strong && (weak || current_weak) {
            return false;
        }
        candidate.trim_start_matches("W/") == current
    })
}

/// Parse a `Range` header against an object of `size` bytes.
///
/// `Ok(None)` means serve the whole object (multiple ranges are not
/// supported and fall back to a full response). `Err` means 416.
fn parse_range(spec: &str, size: u64) -> Result<Option<ByteRange>, ()> {
    let ranges = spec.trim().strip_prefix("bytes=").ok_or(())?;

    let mut parsed = Vec::new();
    for part in ranges.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = part.split_once('-').ok_or(())?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            let suffix: u64 = end.parse().map_err(|_| ())?;
            if suffix == 0 || size == 0 {
                continue;
            }
            let suffix = suffix.min(size);
            parsed.push(ByteRange {
                start: size - suffix,
                end: size - 1,
            });
        } else {
            let first: u64 = start.parse().map_err(|_| ())?;
            let last = if end.is_empty() {
                None
            } else {
                let last: u64 = end.parse().map_err(|_| ())?;
                if last < first {
                    return Err(());
                }
                Some(last)
            };
            if first >= size {
                continue;
            }
            parsed.push(ByteRange {
                start: first,
                end: last.map(|l| l.min(size - 1)).unwrap_or(size - 1),
            });
        }
    }

    match parsed.len() {
        0 => Err(()),
        1 => Ok(parsed.pop()),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use axum::body::to_bytes;
    use axum::http::Request;
    use time::macros::datetime;
    use tower::ServiceExt;

    const MODIFIED: OffsetDateTime = datetime!(2024-03-01 12:00:00 UTC);

    fn service(prefix: &str) -> Router {
        let store = MemoryStore::new()
            .with_object("hello.txt", "hello, tailnet", MODIFIED)
            .with_object("site/index.html", "<h1>home</h1>", MODIFIED)
            .with_object("site/about.txt", "about", MODIFIED)
            .with_object("docs/guide.md", "# guide", MODIFIED)
            .with_object("docs/a <b>.txt", "tricky", MODIFIED)
            .with_object("docs/img/logo.png", "png", MODIFIED)
            .with_object("secret.txt", "nope", MODIFIED)
            .with_object("flaky.txt", "flaky", MODIFIED)
            .with_denied("secret.txt")
            .with_broken("flaky.txt");
        Arc::new(FileService::new(Arc::new(store), prefix)).router()
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn get_with(uri: &str, name: &str, value: &str) -> Request<Body> {
        Request::get(uri).header(name, value).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_existing_object() {
        let (status, headers, body) = send(service(""), get("/hello.txt")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello, tailnet");
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(headers[CONTENT_LENGTH], "14");
        assert_eq!(headers[ACCEPT_RANGES], "bytes");
        assert_eq!(headers[LAST_MODIFIED], "Fri, 01 Mar 2024 12:00:00 GMT");
        assert!(headers.contains_key(ETAG));
    }

    #[tokio::test]
    async fn test_missing_object_is_404() {
        let (status, _, body) = send(service(""), get("/nope.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "404 page not found\n");
    }

    #[tokio::test]
    async fn test_store_failures_map_to_status() {
        let (status, _, _) = send(service(""), get("/secret.txt")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(service(""), get("/flaky.txt")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_key_prefix_applied() {
        let (status, _, body) = send(service("site"), get("/about.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "about");

        let (status, _, _) = send(service("site/"), get("/hello.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_head_has_headers_but_no_body() {
        let req = Request::head("/hello.txt").body(Body::empty()).unwrap();
        let (status, headers, body) = send(service(""), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_LENGTH], "14");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let req = Request::post("/hello.txt").body(Body::empty()).unwrap();
        let (status, headers, _) = send(service(""), req).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn test_byte_range() {
        let (status, headers, body) =
            send(service(""), get_with("/hello.txt", "range", "bytes=0-4")).await;

        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body, "hello");
        assert_eq!(headers[CONTENT_RANGE], "bytes 0-4/14");
        assert_eq!(headers[CONTENT_LENGTH], "5");
    }

    #[tokio::test]
    async fn test_suffix_and_open_ranges() {
        let (status, _, body) =
            send(service(""), get_with("/hello.txt", "range", "bytes=-7")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body, "tailnet");

        let (status, _, body) =
            send(service(""), get_with("/hello.txt", "range", "bytes=7-")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body, "tailnet");
    }

    #[tokio::test]
    async fn test_malformed_range_is_416() {
        for spec in ["bytes=abc", "items=0-1", "bytes=5-2", "bytes=100-200"] {
            let (status, headers, _) =
                send(service(""), get_with("/hello.txt", "range", spec)).await;
            assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE, "range {}", spec);
            assert_eq!(headers[CONTENT_RANGE], "bytes */14");
        }
    }

    #[tokio::test]
    async fn test_multiple_ranges_serve_full_body() {
        let (status, _, body) =
            send(service(""), get_with("/hello.txt", "range", "bytes=0-1,3-4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello, tailnet");
    }

    #[tokio::test]
    async fn test_if_range_mismatch_ignores_range() {
        let req = Request::get("/hello.txt")
            .header("range", "bytes=0-4")
            .header("if-range", "\"stale\"")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(service(""), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello, tailnet");
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let (_, headers, _) = send(service(""), get("/hello.txt")).await;
        let etag = headers[ETAG].to_str().unwrap().to_string();

        let (status, _, body) =
            send(service(""), get_with("/hello.txt", "if-none-match", &etag)).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
        assert!(body.is_empty());

        let (status, _, _) = send(
            service(""),
            get_with("/hello.txt", "if-modified-since", "Fri, 01 Mar 2024 12:00:00 GMT"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);

        let (status, _, _) = send(
            service(""),
            get_with("/hello.txt", "if-modified-since", "Thu, 29 Feb 2024 12:00:00 GMT"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_preconditions() {
        let (status, _, _) =
            send(service(""), get_with("/hello.txt", "if-match", "\"other\"")).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);

        let (status, _, _) = send(
            service(""),
            get_with("/hello.txt", "if-unmodified-since", "Thu, 29 Feb 2024 12:00:00 GMT"),
        )
        .await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_directory_redirects_to_slash() {
        let (status, headers, _) = send(service(""), get("/docs?sort=name")).await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(headers[LOCATION], "/docs/?sort=name");
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_redirects() {
        let (status, headers, _) = send(service(""), get("/docs/guide.md/")).await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(headers[LOCATION], "/docs/guide.md");
    }

    #[tokio::test]
    async fn test_directory_index_served() {
        let (status, headers, body) = send(service(""), get("/site/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>home</h1>");
        assert_eq!(headers[CONTENT_TYPE], "text/html");

        let (status, _, body) = send(service("site"), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_index_html_redirects_to_directory() {
        let (status, headers, _) = send(service(""), get("/site/index.html")).await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(headers[LOCATION], "/site/");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let (status, headers, body) = send(service(""), get("/docs/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body.contains("<a href=\"./guide.md\">guide.md</a>"));
        assert!(body.contains("<a href=\"./img/\">img/</a>"));
        assert!(body.contains("<a href=\"./a%20%3Cb%3E.txt\">a &lt;b&gt;.txt</a>"));
        let guide = body.find("guide.md").unwrap();
        let img = body.find("img/").unwrap();
        assert!(guide < img);
    }

    #[tokio::test]
    async fn test_listing_links_stay_relative() {
        let store = MemoryStore::new()
            .with_object("docs/javascript:alert(1)", "x", MODIFIED)
            .with_object("docs/mailto:someone", "x", MODIFIED);
        let router = Arc::new(FileService::new(Arc::new(store), "")).router();

        let (status, _, body) = send(router, get("/docs/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("href=\"javascript:"), "{}", body);
        assert!(!body.contains("href=\"mailto:"), "{}", body);
        assert!(body.contains("<a href=\"./javascript:alert(1)\">javascript:alert(1)</a>"));
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let (status, _, body) = send(service(""), get("/docs/a%20%3Cb%3E.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "tricky");
    }

    #[tokio::test]
    async fn test_dot_dot_rejected() {
        let (status, _, _) = send(service("site"), get("/../hello.txt")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("//a//b/"), "/a/b/");
        assert_eq!(clean_path("/a/./b"), "/a/b");
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=0-0", 10), Ok(Some(ByteRange { start: 0, end: 0 })));
        assert_eq!(parse_range("bytes=5-100", 10), Ok(Some(ByteRange { start: 5, end: 9 })));
        assert_eq!(parse_range("bytes=-100", 10), Ok(Some(ByteRange { start: 0, end: 9 })));
        assert_eq!(parse_range("bytes=10-", 10), Err(()));
        assert_eq!(parse_range("bytes=-0", 10), Err(()));
        assert_eq!(parse_range("bytes=0-1,5-6", 10), Ok(None));
        assert_eq!(parse_range("bytes=1", 10), Err(()));
    }
}
