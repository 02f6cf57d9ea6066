// File: src/config.rs
// Purpose: Configuration parsing from launch.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Emulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub functions: FunctionsConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where function files live and which of them are eligible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Directory under the project root holding function files (default: "functions")
    #[serde(default = "default_functions_dir")]
    pub dir: String,

    /// Supported source extension, without the dot (default: "js")
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Reserved proxy marker excluded from routing (default: "[proxy].edge.js")
    #[serde(default = "default_proxy_edge_file")]
    pub proxy_edge_file: String,

    /// Dotenv file at the project root handed to every function (default: ".env.local")
    #[serde(default = "default_env_file")]
    pub env_file: String,
}

/// Request matching options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Whether literal segments match case-insensitively (default: true)
    #[serde(default = "default_true")]
    pub case_insensitive: bool,

    /// Largest request body accepted, in bytes (default: 1 MiB)
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

/// Program used by the subprocess compiler to run a function file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the function path
    #[serde(default)]
    pub args: Vec<String>,

    /// Wrap each file with the built-in Node runner that calls its default
    /// export with `(req, res)` (default: true)
    #[serde(default = "default_true")]
    pub runner: bool,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_functions_dir() -> String {
    "functions".to_string()
}

fn default_extension() -> String {
    "js".to_string()
}

fn default_proxy_edge_file() -> String {
    "[proxy].edge.js".to_string()
}

fn default_env_file() -> String {
    ".env.local".to_string()
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_program() -> String {
    "node".to_string()
}

fn default_true() -> bool {
    true
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            dir: default_functions_dir(),
            extension: default_extension(),
            proxy_edge_file: default_proxy_edge_file(),
            env_file: default_env_file(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            body_limit: default_body_limit(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            runner: true,
        }
    }
}

impl Config {
    /// Name of the optional configuration file at the project root
    pub const FILE_NAME: &'static str = "launch.toml";

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load `launch.toml` from the project root
    pub fn load_from_project(project_root: impl AsRef<Path>) -> Result<Self> {
        Self::load(project_root.as_ref().join(Self::FILE_NAME))
    }
}
