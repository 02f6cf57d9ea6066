// File: src/resource.rs
// Purpose: Turns discovered files into routable function resources

use std::path::{Path, PathBuf};

use launch_router::path::route_path_from_relative;
use launch_router::RouteSource;
use tracing::debug;

use crate::compiler::HandlerCompiler;
use crate::config::FunctionsConfig;
use crate::error::ServeError;
use crate::handler::SharedHandler;
use crate::walker::walk_functions;

/// A compiled function bound to the route derived from its location
#[derive(Clone)]
pub struct FunctionResource {
    pub source_path: PathBuf,
    pub route_path: String,
    pub handler: SharedHandler,
}

impl std::fmt::Debug for FunctionResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionResource")
            .field("source_path", &self.source_path)
            .field("route_path", &self.route_path)
            .finish()
    }
}

impl RouteSource for FunctionResource {
    fn source_path(&self) -> &Path {
        &self.source_path
    }

    fn route_path(&self) -> &str {
        &self.route_path
    }

    fn with_route_path(self, route_path: String) -> Self {
        Self { route_path, ..self }
    }
}

/// Whether a walked file may become a function
///
/// The proxy marker and files with another extension are silently skipped.
pub fn is_function_file(path: &Path, config: &FunctionsConfig) -> bool {
    let is_proxy = path
        .file_name()
        .map(|name| name == config.proxy_edge_file.as_str())
        .unwrap_or(false);
    let has_extension = path
        .extension()
        .map(|ext| ext == config.extension.as_str())
        .unwrap_or(false);

    !is_proxy && has_extension
}

/// Walks `functions_root`, compiles every eligible file and returns the
/// resources in discovery order
pub async fn parse_function_resources(
    functions_root: &Path,
    config: &FunctionsConfig,
    compiler: &dyn HandlerCompiler,
) -> Result<Vec<FunctionResource>, ServeError> {
    let files = walk_functions(functions_root)?;
    let root = files.root().to_path_buf();
    let mut resources = Vec::new();

    for path in files {
        let path = path?;
        if !is_function_file(&path, config) {
            continue;
        }

        let handler = compiler
            .compile(&path)
            .await
            .map_err(|source| ServeError::Compile {
                path: path.clone(),
                source,
            })?;

        let Some(handler) = handler else {
            debug!("Skipping {:?}: no handler exported", path);
            continue;
        };

        let relative = path.strip_prefix(&root).unwrap_or(&path);
        let route_path = route_path_from_relative(relative);
        debug!("Found function {:?} -> {}", relative, route_path);

        resources.push(FunctionResource {
            source_path: path,
            route_path,
            handler,
        });
    }

    Ok(resources)
}
