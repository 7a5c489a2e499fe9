//! Path rewriting and target URL construction.
//!
//! [`rewrite`] is the only place the target context is prepended to a
//! request path. [`target_url`] is computed once per route and used for
//! logging and redirect rewriting; [`upstream_uri`] joins the upstream
//! base with a rewritten path at request time.
//!
//! Slashes are only normalized where two parts meet. The client's own path
//! is forwarded byte for byte, so `/to/https://a//b` keeps its slashes.

/// Split a raw `path?query` on the first `?` only.
#[must_use]
pub fn split_path_and_query(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    }
}

/// Prepend `target_context_path` to `request_path` and re-append the query.
#[must_use]
pub fn rewrite(request_path: &str, request_query: Option<&str>, target_context_path: &str) -> String {
    let prefix = target_context_path.trim_end_matches('/');
    let mut out = String::with_capacity(
        prefix.len() + request_path.len() + request_query.map_or(0, |q| q.len() + 2),
    );
    out.push_str(prefix);
    if !request_path.is_empty() && !request_path.starts_with('/') {
        out.push('/');
    }
    out.push_str(request_path);
    if let Some(query) = request_query {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Collapse every run of `/` into one.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !previous_slash {
                out.push(ch);
            }
            previous_slash = true;
        } else {
            out.push(ch);
            previous_slash = false;
        }
    }
    out
}

/// Collapse duplicate slashes in a URL while keeping the scheme separator
/// as exactly `://`. Only the part before any `?` is touched.
#[must_use]
pub fn normalize_slashes(url: &str) -> String {
    let (head, query) = split_path_and_query(url);
    let mut out = match head.split_once(":/") {
        Some((scheme, rest)) if !scheme.is_empty() && !scheme.contains('/') => {
            format!("{scheme}://{}", collapse_slashes(rest).trim_start_matches('/'))
        }
        _ => collapse_slashes(head),
    };
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Per-route resolution target: `upstream_host/target_context_path`.
#[must_use]
pub fn target_url(upstream_host: &str, target_context_path: &str) -> String {
    normalize_slashes(&format!(
        "{}/{}",
        upstream_host.trim_end_matches('/'),
        target_context_path
    ))
}

/// Final upstream URI for one request: exactly one `/` between the
/// upstream base and the rewritten path.
#[must_use]
pub fn upstream_uri(upstream_host: &str, rewritten_path: &str) -> String {
    format!(
        "{}/{}",
        upstream_host.trim_end_matches('/'),
        rewritten_path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_question_mark_only() {
        assert_eq!(split_path_and_query("/a/b"), ("/a/b", None));
        assert_eq!(split_path_and_query("/a?x=1"), ("/a", Some("x=1")));
        assert_eq!(
            split_path_and_query("/a?x=1?y=2%3F"),
            ("/a", Some("x=1?y=2%3F"))
        );
        assert_eq!(split_path_and_query("/a?"), ("/a", Some("")));
    }

    #[test]
    fn rewrite_prepends_target_and_keeps_query() {
        assert_eq!(rewrite("/users", Some("id=5"), "/v1"), "/v1/users?id=5");
        assert_eq!(rewrite("/users", None, "/v1"), "/v1/users");
        assert_eq!(rewrite("/", None, "/v1"), "/v1/");
        assert_eq!(rewrite("", None, "/v1"), "/v1");
    }

    #[test]
    fn target_url_strips_trailing_slashes_idempotently() {
        assert_eq!(target_url("http://a/", "/v1"), "http://a/v1");
        assert_eq!(target_url("http://a", "/v1"), target_url("http://a/", "/v1"));
        assert_eq!(target_url("http://a///", "/v1"), "http://a/v1");
    }

    #[test]
    fn target_url_keeps_scheme_separator() {
        assert_eq!(
            target_url("https://backend:8443", "/v1"),
            "https://backend:8443/v1"
        );
        assert_eq!(
            target_url("http://backend/base/", "//v1"),
            "http://backend/base/v1"
        );
    }

    #[test]
    fn upstream_uri_has_no_duplicated_segments() {
        let rewritten = rewrite("/users", Some("id=5"), "/v1");
        assert_eq!(
            upstream_uri("http://backend:8080", &rewritten),
            "http://backend:8080/v1/users?id=5"
        );
        assert_eq!(
            upstream_uri("http://backend:8080/", "/v1/users/"),
            "http://backend:8080/v1/users/"
        );
    }

    #[test]
    fn target_prefix_joins_with_one_slash() {
        assert_eq!(rewrite("/users", None, "/v1/"), "/v1/users");
        assert_eq!(rewrite("/users", None, "/"), "/users");
        assert_eq!(rewrite("users", None, "/v1"), "/v1/users");
        assert_eq!(upstream_uri("http://b///", "//v1/users"), "http://b/v1/users");
    }

    #[test]
    fn client_path_slashes_are_forwarded_as_received() {
        let rewritten = rewrite("/to/https://foo.com//bar", Some("a=1"), "/v1");
        assert_eq!(
            upstream_uri("http://b:8080", &rewritten),
            "http://b:8080/v1/to/https://foo.com//bar?a=1"
        );
        assert_eq!(
            upstream_uri("http://b:8080", &rewrite("/a//b/", None, "/v1")),
            "http://b:8080/v1/a//b/"
        );
    }

    #[test]
    fn query_slashes_are_left_alone() {
        assert_eq!(
            upstream_uri("http://b", "/v1/login?next=http://x//y"),
            "http://b/v1/login?next=http://x//y"
        );
    }
}
