// File: src/walker.rs
// Purpose: Recursive listing of candidate function files

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ServeError;

/// Lazy iterator over every regular file below a functions root
///
/// Entries are yielded in file-name order at each level, so discovery order
/// (and therefore route precedence) does not depend on the platform.
pub struct FunctionFiles {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl FunctionFiles {
    /// Canonical root the walk started from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for FunctionFiles {
    type Item = Result<PathBuf, ServeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_file() => return Some(Ok(entry.into_path())),
                Ok(_) => continue,
                Err(e) => return Some(Err(ServeError::Walk(e))),
            }
        }
    }
}

/// Starts a walk below `root`
///
/// Fails up front when `root` is missing or not a directory.
pub fn walk_functions(root: impl AsRef<Path>) -> Result<FunctionFiles, ServeError> {
    let root = root.as_ref();
    let not_found = || ServeError::FunctionsDirectoryNotFound {
        path: root.to_path_buf(),
    };

    let root = root.canonicalize().map_err(|_| not_found())?;
    if !root.is_dir() {
        return Err(not_found());
    }

    let inner = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    Ok(FunctionFiles { root, inner })
}
