// File: src/env.rs
// Purpose: Environment handed to every function invocation

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::ServeError;

/// Process environment overlaid with the project's dotenv file
///
/// Variables already present in the process keep their value; the file only
/// fills gaps. The map is immutable once loaded and cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionEnv {
    vars: Arc<BTreeMap<String, String>>,
}

impl FunctionEnv {
    /// Reads the process environment, then the dotenv file at `path` if it exists
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServeError> {
        let path = path.as_ref();

        let mut vars: BTreeMap<String, String> = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();

        if !path.is_file() {
            debug!("No env file at {:?}", path);
            return Ok(Self::from_vars(vars));
        }

        let env_error = |source| ServeError::Env {
            path: path.to_path_buf(),
            source,
        };

        let mut loaded = 0;
        for item in dotenvy::from_path_iter(path).map_err(env_error)? {
            let (key, value) = item.map_err(env_error)?;
            vars.entry(key).or_insert_with(|| {
                loaded += 1;
                value
            });
        }

        debug!("Loaded {} variables from {:?}", loaded, path);
        Ok(Self::from_vars(vars))
    }

    /// Builds an environment from explicit variables, ignoring the process
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Arc::new(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
