/// Route classification into exact and dynamic groups
///
/// Classification never reorders: both groups keep the relative order in which
/// resources were discovered, which is also their registration order.

use std::path::Path;

use crate::path::{has_dynamic_segment, to_parameter_syntax};

/// Anything that was discovered on disk and maps to a route path
///
/// Implemented by the function resources of the serving layer; the router core
/// only needs these three accessors.
pub trait RouteSource {
    /// Absolute path of the file the route was derived from
    fn source_path(&self) -> &Path;

    /// Route path, either in bracket form (`/users/[id]`) or rewritten (`/users/:id`)
    fn route_path(&self) -> &str;

    /// Returns the same source under a different route path
    fn with_route_path(self, route_path: String) -> Self
    where
        Self: Sized;
}

/// Output of [`classify`]
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGroup<R> {
    /// Sources without any parameter segment
    pub exact: Vec<R>,
    /// Sources with at least one parameter, already rewritten to `:name` syntax
    pub dynamic: Vec<R>,
}

impl<R> Default for RouteGroup<R> {
    fn default() -> Self {
        Self {
            exact: Vec::new(),
            dynamic: Vec::new(),
        }
    }
}

impl<R> RouteGroup<R> {
    pub fn len(&self) -> usize {
        self.exact.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.dynamic.is_empty()
    }

    /// Exact sources followed by dynamic sources, i.e. registration order
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.exact.iter().chain(self.dynamic.iter())
    }
}

/// Partitions sources into exact and dynamic routes (order preserving)
///
/// # Examples
///
/// ```
/// use launch_router::{classify, RouteSource};
/// use std::path::{Path, PathBuf};
///
/// #[derive(Debug)]
/// struct File(PathBuf, String);
///
/// impl RouteSource for File {
///     fn source_path(&self) -> &Path { &self.0 }
///     fn route_path(&self) -> &str { &self.1 }
///     fn with_route_path(self, route_path: String) -> Self { File(self.0, route_path) }
/// }
///
/// let group = classify(vec![
///     File("users/[id].js".into(), "/users/[id]".into()),
///     File("health.js".into(), "/health".into()),
/// ]);
///
/// assert_eq!(group.exact[0].route_path(), "/health");
/// assert_eq!(group.dynamic[0].route_path(), "/users/:id");
/// ```
pub fn classify<R, I>(sources: I) -> RouteGroup<R>
where
    R: RouteSource,
    I: IntoIterator<Item = R>,
{
    sources
        .into_iter()
        .fold(RouteGroup::default(), |mut group, source| {
            if has_dynamic_segment(source.route_path()) {
                let rewritten = to_parameter_syntax(source.route_path()).into_owned();
                group.dynamic.push(source.with_route_path(rewritten));
            } else {
                group.exact.push(source);
            }
            group
        })
}
