use std::path::PathBuf;
use thiserror::Error;

use crate::segment::NamingIssue;

/// Structural problems that make a set of function routes unsafe to serve
///
/// Every variant carries the file(s) involved so the message points straight at
/// what has to be renamed or moved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "dynamic route `{segment}` in {source_path:?} cannot sit directly under the functions directory; \
         move it into a sub-directory (e.g. `/items/{segment}`)"
    )]
    TopLevelDynamicRoute {
        source_path: PathBuf,
        route_path: String,
        segment: String,
    },

    #[error("invalid file path naming in {source_path:?}: segment `{segment}` of `{route_path}` {issue}")]
    InvalidFilepathNaming {
        source_path: PathBuf,
        route_path: String,
        segment: String,
        issue: NamingIssue,
    },

    #[error("dynamic route name `{name}` is used more than once in `{route_path}` ({source_path:?})")]
    IndistinctDynamicRouteNamesInPath {
        source_path: PathBuf,
        route_path: String,
        name: String,
    },

    #[error(
        "conflicting dynamic routes at level {level} under `{parent}`: \
         `[{existing_name}]` in {existing_path:?} and `[{conflicting_name}]` in {conflicting_path:?}; \
         sibling dynamic routes must use the same parameter name"
    )]
    ExistingDynamicRouteAtSameLevel {
        level: usize,
        parent: String,
        existing_name: String,
        existing_path: PathBuf,
        conflicting_name: String,
        conflicting_path: PathBuf,
    },
}

impl ValidationError {
    /// Source file that triggered the error
    pub fn source_path(&self) -> &std::path::Path {
        match self {
            ValidationError::TopLevelDynamicRoute { source_path, .. }
            | ValidationError::InvalidFilepathNaming { source_path, .. }
            | ValidationError::IndistinctDynamicRouteNamesInPath { source_path, .. } => source_path,
            ValidationError::ExistingDynamicRouteAtSameLevel { conflicting_path, .. } => conflicting_path,
        }
    }
}
