// File: src/compiler.rs
// Purpose: Boundary that turns a function source file into a handler

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::handler::SharedHandler;

/// Compiles one source file into an invokable handler
///
/// `Ok(None)` means the file exports nothing callable and is skipped.
/// `Err` is a setup failure and aborts startup.
#[async_trait]
pub trait HandlerCompiler: Send + Sync {
    async fn compile(&self, source_path: &Path) -> anyhow::Result<Option<SharedHandler>>;
}

/// In-process compiler backed by a static registration table
///
/// Handlers are keyed by their path relative to the functions root
/// (`users/[id].js`); a source file matches when its path ends with the key.
/// When several keys match, the one with the most components wins, so
/// `a/hello.js` is picked over `hello.js` for `functions/a/hello.js`.
/// Unregistered files compile to `None`.
#[derive(Default, Clone)]
pub struct RegistryCompiler {
    handlers: Vec<(PathBuf, SharedHandler)>,
}

impl RegistryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a relative source path (functional builder)
    pub fn register(mut self, relative: impl Into<PathBuf>, handler: SharedHandler) -> Self {
        self.handlers.push((relative.into(), handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for RegistryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCompiler")
            .field("handlers", &self.handlers.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl HandlerCompiler for RegistryCompiler {
    async fn compile(&self, source_path: &Path) -> anyhow::Result<Option<SharedHandler>> {
        Ok(self
            .handlers
            .iter()
            .filter(|(relative, _)| source_path.ends_with(relative))
            // `rev` keeps the earliest registration on equal length
            .rev()
            .max_by_key(|(relative, _)| relative.components().count())
            .map(|(_, handler)| handler.clone()))
    }
}
