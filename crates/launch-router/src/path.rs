/// Path utilities for route derivation and normalization
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::path::{Component, Path};

/// Matches a bracketed parameter such as `[id]`, capturing the name
static BRACKETED_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("bracketed parameter regex is valid"));

/// Derives a route path from a file path relative to the functions directory
///
/// Directory components are kept, the file extension is dropped, and segments are
/// always joined with `/` whatever the host separator is.
///
/// # Examples
///
/// ```
/// use launch_router::path::route_path_from_relative;
/// use std::path::Path;
///
/// assert_eq!(route_path_from_relative(Path::new("users/[id].js")), "/users/[id]");
/// assert_eq!(route_path_from_relative(Path::new("a/b/c.js")), "/a/b/c");
/// assert_eq!(route_path_from_relative(Path::new("hello.js")), "/hello");
/// ```
pub fn route_path_from_relative(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        let stem = Path::new(last.as_str())
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        if let Some(stem) = stem {
            *last = stem;
        }
    }

    format!("/{}", segments.join("/"))
}

/// Iterates the non-empty segments of a route or request path
///
/// ```
/// use launch_router::path::segments;
///
/// let parts: Vec<&str> = segments("/users/[id]/posts").collect();
/// assert_eq!(parts, vec!["users", "[id]", "posts"]);
/// ```
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Returns true if the path contains at least one bracketed parameter
pub fn has_dynamic_segment(route_path: &str) -> bool {
    BRACKETED_PARAM.is_match(route_path)
}

/// Rewrites every `[name]` into the `:name` parameter syntax
///
/// Returns `Cow::Borrowed` when there is nothing to rewrite.
///
/// ```
/// use launch_router::path::to_parameter_syntax;
///
/// assert_eq!(to_parameter_syntax("/users/[id]/posts/[postId]"), "/users/:id/posts/:postId");
/// assert_eq!(to_parameter_syntax("/users"), "/users");
/// ```
pub fn to_parameter_syntax(route_path: &str) -> Cow<'_, str> {
    BRACKETED_PARAM.replace_all(route_path, ":$1")
}

/// Validates if a path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//` or `\`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || !path.starts_with('/') {
        return false;
    }

    if path.contains("//") || path.contains('\\') {
        return false;
    }

    path == "/" || !path.ends_with('/')
}

/// Normalize a request path to canonical form
///
/// Zero-copy for paths that are already canonical (`Cow::Borrowed`).
///
/// - Trailing slashes: `/path/` → `/path`
/// - Double slashes: `/path//to` → `/path/to`
/// - Backslashes: `\path\to` → `/path/to`
///
/// ```
/// use launch_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/about"), Cow::Borrowed("/about")));
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}
