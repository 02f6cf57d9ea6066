/// Static validation of a discovered route set
///
/// Runs once over every source in discovery order and stops at the first
/// violation. For each source the checks are: segment naming, reused parameter
/// names, a parameter at the top level, and a parameter name that disagrees with
/// a sibling declared earlier at the same level.
///
/// A route set that passes forms a conflict-free trie: one variable child per
/// level at most, path-unique parameter names, and no bare parameter at the root.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::classify::RouteSource;
use crate::error::ValidationError;
use crate::path::segments;
use crate::segment::{parse_segment, Segment};

/// The dynamic child already claimed under a given parent
struct DynamicChild<'a> {
    name: &'a str,
    source_path: &'a Path,
}

/// Validates sources whose route paths are still in bracket form (`/users/[id]`)
///
/// # Examples
///
/// ```
/// use launch_router::{validate, RouteSource, ValidationError};
/// use std::path::{Path, PathBuf};
///
/// struct File(PathBuf, String);
///
/// impl RouteSource for File {
///     fn source_path(&self) -> &Path { &self.0 }
///     fn route_path(&self) -> &str { &self.1 }
///     fn with_route_path(self, route_path: String) -> Self { File(self.0, route_path) }
/// }
///
/// let ok = vec![
///     File("users/[id].js".into(), "/users/[id]".into()),
///     File("users/[id]/posts.js".into(), "/users/[id]/posts".into()),
/// ];
/// assert!(validate(&ok).is_ok());
///
/// let conflicting = vec![
///     File("users/[id].js".into(), "/users/[id]".into()),
///     File("users/[userId].js".into(), "/users/[userId]".into()),
/// ];
/// assert!(matches!(
///     validate(&conflicting),
///     Err(ValidationError::ExistingDynamicRouteAtSameLevel { .. })
/// ));
/// ```
pub fn validate<R: RouteSource>(sources: &[R]) -> Result<(), ValidationError> {
    validate_sources(sources, false)
}

/// Like [`validate`], for tables that match literal segments case-insensitively
///
/// `Users/[id]` and `users/[slug]` serve the same requests there, so their
/// parents count as one level.
pub fn validate_ignoring_case<R: RouteSource>(sources: &[R]) -> Result<(), ValidationError> {
    validate_sources(sources, true)
}

fn validate_sources<R: RouteSource>(sources: &[R], fold_case: bool) -> Result<(), ValidationError> {
    let mut levels: HashMap<String, DynamicChild<'_>> = HashMap::new();

    for source in sources {
        validate_source(source, &mut levels, fold_case)?;
    }

    Ok(())
}

fn validate_source<'a, R: RouteSource>(
    source: &'a R,
    levels: &mut HashMap<String, DynamicChild<'a>>,
    fold_case: bool,
) -> Result<(), ValidationError> {
    let route_path = source.route_path();
    let parsed = parse_segments(source)?;

    check_distinct_names(source, &parsed)?;
    check_top_level(source, &parsed)?;

    // Parent key is the raw prefix, e.g. "/users/[id]" for the segment after it
    let mut parent = String::new();
    for (index, (raw, segment)) in segments(route_path).zip(&parsed).enumerate() {
        if let Segment::Dynamic(name) = segment {
            let key = if fold_case {
                parent.to_ascii_lowercase()
            } else {
                parent.clone()
            };

            match levels.get(&key) {
                Some(existing) if existing.name != *name => {
                    return Err(ValidationError::ExistingDynamicRouteAtSameLevel {
                        level: index + 1,
                        parent: if parent.is_empty() { "/".to_string() } else { parent },
                        existing_name: existing.name.to_string(),
                        existing_path: existing.source_path.to_path_buf(),
                        conflicting_name: name.to_string(),
                        conflicting_path: source.source_path().to_path_buf(),
                    });
                }
                Some(_) => {}
                None => {
                    levels.insert(
                        key,
                        DynamicChild {
                            name: *name,
                            source_path: source.source_path(),
                        },
                    );
                }
            }
        }

        parent.push('/');
        parent.push_str(raw);
    }

    Ok(())
}

fn parse_segments<R: RouteSource>(source: &R) -> Result<Vec<Segment<'_>>, ValidationError> {
    let route_path = source.route_path();

    segments(route_path)
        .map(|raw| {
            parse_segment(raw).map_err(|issue| ValidationError::InvalidFilepathNaming {
                source_path: source.source_path().to_path_buf(),
                route_path: route_path.to_string(),
                segment: raw.to_string(),
                issue,
            })
        })
        .collect()
}

fn check_distinct_names<R: RouteSource>(source: &R, parsed: &[Segment<'_>]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();

    match parsed
        .iter()
        .filter_map(Segment::param_name)
        .find(|name| !seen.insert(*name))
    {
        Some(name) => Err(ValidationError::IndistinctDynamicRouteNamesInPath {
            source_path: source.source_path().to_path_buf(),
            route_path: source.route_path().to_string(),
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_top_level<R: RouteSource>(source: &R, parsed: &[Segment<'_>]) -> Result<(), ValidationError> {
    match parsed.first() {
        Some(Segment::Dynamic(name)) => Err(ValidationError::TopLevelDynamicRoute {
            source_path: source.source_path().to_path_buf(),
            route_path: source.route_path().to_string(),
            segment: format!("[{}]", name),
        }),
        _ => Ok(()),
    }
}
