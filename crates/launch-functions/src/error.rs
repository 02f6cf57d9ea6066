// File: src/error.rs
// Purpose: Startup errors for the functions server

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use launch_router::ValidationError;
use thiserror::Error;

/// Anything that stops the server from reaching the listening state
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("functions directory not found: {path:?}")]
    FunctionsDirectoryNotFound { path: PathBuf },

    #[error("failed to walk functions directory")]
    Walk(#[from] walkdir::Error),

    #[error("failed to compile function {path:?}")]
    Compile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to load environment file {path:?}")]
    Env {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid listen address {addr}")]
    Address { addr: String },

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error")]
    Serve(#[source] io::Error),
}
