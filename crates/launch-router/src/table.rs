/// Registration-ordered route table
///
/// Routes are matched in the order they were registered and the first match
/// wins. Registering exact routes before dynamic ones therefore guarantees that
/// `/users` resolves to the exact route even when `/users/:id` also exists, and
/// that among dynamic routes the earliest discovered pattern takes precedence.

use std::collections::HashMap;

use crate::classify::{RouteGroup, RouteSource};
use crate::path::{normalize_path, segments};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternPart {
    Literal(String),
    Param(String),
}

#[derive(Debug)]
struct Entry<T> {
    pattern: String,
    parts: Vec<PatternPart>,
    value: T,
}

/// Result of matching a request path
#[derive(Debug)]
pub struct RouteMatch<'t, T> {
    /// Registered pattern, e.g. `/users/:id`
    pub pattern: &'t str,
    /// Value registered for the pattern
    pub value: &'t T,
    /// Percent-decoded parameter values keyed by name
    pub params: HashMap<String, String>,
}

/// Ordered table of `:param` patterns
///
/// # Examples
///
/// ```
/// use launch_router::RouteTable;
///
/// let mut table = RouteTable::new();
/// table.insert("/users", "list");
/// table.insert("/users/:id", "show");
///
/// assert_eq!(*table.at("/users").unwrap().value, "list");
///
/// let found = table.at("/users/42").unwrap();
/// assert_eq!(*found.value, "show");
/// assert_eq!(found.params.get("id"), Some(&"42".to_string()));
/// ```
#[derive(Debug)]
pub struct RouteTable<T> {
    entries: Vec<Entry<T>>,
    case_insensitive: bool,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty, case-sensitive table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            case_insensitive: false,
        }
    }

    /// Configures case sensitivity of literal segments (functional builder)
    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Appends a pattern; earlier registrations win over later ones
    pub fn insert(&mut self, pattern: impl Into<String>, value: T) {
        let pattern = pattern.into();
        let parts = segments(&pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => PatternPart::Param(name.to_string()),
                None => PatternPart::Literal(segment.to_string()),
            })
            .collect();

        self.entries.push(Entry { pattern, parts, value });
    }

    /// Matches a request path against the table, first registered match wins
    pub fn at(&self, path: &str) -> Option<RouteMatch<'_, T>> {
        let normalized = normalize_path(path);
        let request: Vec<&str> = segments(&normalized).collect();

        self.entries.iter().find_map(|entry| {
            self.match_entry(entry, &request).map(|params| RouteMatch {
                pattern: &entry.pattern,
                value: &entry.value,
                params,
            })
        })
    }

    fn match_entry(&self, entry: &Entry<T>, request: &[&str]) -> Option<HashMap<String, String>> {
        if entry.parts.len() != request.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (part, segment) in entry.parts.iter().zip(request) {
            match part {
                PatternPart::Literal(literal) => {
                    let equal = if self.case_insensitive {
                        literal.eq_ignore_ascii_case(segment)
                    } else {
                        literal == segment
                    };
                    if !equal {
                        return None;
                    }
                }
                PatternPart::Param(name) => {
                    let value = urlencoding::decode(segment)
                        .map(|decoded| decoded.into_owned())
                        .unwrap_or_else(|_| segment.to_string());
                    params.insert(name.clone(), value);
                }
            }
        }

        Some(params)
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: RouteSource> From<RouteGroup<R>> for RouteTable<R> {
    /// Registers exact routes first, then dynamic routes, each in discovery order
    fn from(group: RouteGroup<R>) -> Self {
        let mut table = RouteTable::new();
        for source in group.exact.into_iter().chain(group.dynamic) {
            let pattern = source.route_path().to_string();
            table.insert(pattern, source);
        }
        table
    }
}
