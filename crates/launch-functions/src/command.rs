// File: src/command.rs
// Purpose: Out-of-process compiler that runs function files with an external runtime

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use axum::http::{header, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::compiler::HandlerCompiler;
use crate::config::RuntimeConfig;
use crate::env::FunctionEnv;
use crate::handler::{FunctionHandler, FunctionRequest, FunctionResponse, SharedHandler};

/// ES module `export default` or CommonJS `module.exports =` / `exports.default =`
static DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(export\s+default\b|module\.exports\s*=|exports\.default\s*=)")
        .expect("default export pattern is valid")
});

/// Node script that imports a function file, calls its default export with
/// `(req, res)` and prints the recorded response
pub const NODE_RUNNER: &str = include_str!("runner.mjs");

/// Whether a source file declares a default export in either module convention
pub fn has_default_export(source: &str) -> bool {
    DEFAULT_EXPORT.is_match(source)
}

/// Compiles function files into handlers that spawn `<program> <args..> <file>`
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs every file through [`NODE_RUNNER`] (`--input-type=module --eval`)
    pub fn with_node_runner(mut self) -> Self {
        self.args
            .extend(["--input-type=module", "--eval", NODE_RUNNER].map(String::from));
        self
    }
}

impl From<&RuntimeConfig> for CommandCompiler {
    fn from(runtime: &RuntimeConfig) -> Self {
        let compiler = Self::new(runtime.program.clone()).with_args(runtime.args.iter().cloned());
        if runtime.runner {
            compiler.with_node_runner()
        } else {
            compiler
        }
    }
}

#[async_trait]
impl HandlerCompiler for CommandCompiler {
    async fn compile(&self, source_path: &Path) -> anyhow::Result<Option<SharedHandler>> {
        let source = tokio::fs::read_to_string(source_path)
            .await
            .with_context(|| format!("Failed to read function source: {:?}", source_path))?;

        if !has_default_export(&source) {
            debug!("No default export in {:?}", source_path);
            return Ok(None);
        }

        Ok(Some(Arc::new(CommandHandler {
            program: self.program.clone(),
            args: self.args.clone(),
            source_path: source_path.to_path_buf(),
        })))
    }
}

/// Handler that runs one function file per request
#[derive(Debug, Clone)]
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
    source_path: PathBuf,
}

/// What the function prints on stdout
#[derive(Debug, Default, Deserialize)]
struct CommandOutput {
    status: Option<u16>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<JsonValue>,
}

impl CommandOutput {
    fn into_response(self) -> anyhow::Result<FunctionResponse> {
        let status = match self.status {
            Some(code) => StatusCode::from_u16(code).map_err(|_| anyhow!("invalid status code {}", code))?,
            None => StatusCode::OK,
        };

        let mut response = match self.body {
            None | Some(JsonValue::Null) => FunctionResponse::empty(status),
            Some(JsonValue::String(text)) => FunctionResponse::text(text),
            Some(value) => FunctionResponse::json(&value),
        }
        .with_status(status);

        for (name, value) in &self.headers {
            response = response.with_header(name, value);
        }

        Ok(response)
    }
}

#[async_trait]
impl FunctionHandler for CommandHandler {
    async fn call(&self, request: FunctionRequest, env: FunctionEnv) -> anyhow::Result<FunctionResponse> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.source_path)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {} for {:?}", self.program, self.source_path))?;

        let payload = serde_json::to_vec(&request.to_json())?;
        let stdin = child.stdin.take();

        // Stdin is fed while stdout is drained so neither pipe can fill up and stall
        let write = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                // A function that never reads its input may exit before the write lands
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        written.context("Failed to write request to function")?;
        let output = output?;
        if !output.status.success() {
            bail!(
                "function {:?} exited with {}: {}",
                self.source_path,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let parsed: CommandOutput = if output.stdout.iter().all(u8::is_ascii_whitespace) {
            CommandOutput::default()
        } else {
            serde_json::from_slice(&output.stdout)
                .with_context(|| format!("Function {:?} printed invalid JSON", self.source_path))?
        };

        let response = parsed.into_response()?;
        debug!(
            "{} {} -> {} ({})",
            request.method,
            request.path(),
            response.status,
            response.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("-")
        );
        Ok(response)
    }
}
