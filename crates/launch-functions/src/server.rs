// File: src/server.rs
// Purpose: Startup pipeline (discover, validate, classify) and the HTTP listener

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::Router;
use launch_router::{classify, validate, validate_ignoring_case, RouteTable};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::command::CommandCompiler;
use crate::compiler::HandlerCompiler;
use crate::config::Config;
use crate::dispatch::{dispatch, AppState};
use crate::env::FunctionEnv;
use crate::error::ServeError;
use crate::resource::{parse_function_resources, FunctionResource};

/// How a serve call ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Nothing to route; no port was bound
    NoFunctions,
    /// The listener shut down gracefully
    Stopped,
}

/// Server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Validating,
    Listening,
    /// Setup, validation or bind failed; terminal
    Aborted,
}

/// Validated routes ready to be served
pub struct PreparedFunctions {
    table: Arc<RouteTable<FunctionResource>>,
    env: FunctionEnv,
    body_limit: usize,
}

impl PreparedFunctions {
    /// Route patterns in registration order (exact first, then dynamic)
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.table.patterns()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn env(&self) -> &FunctionEnv {
        &self.env
    }

    /// Axum app dispatching every method and path through the route table
    pub fn router(&self) -> Router {
        let state = AppState {
            table: self.table.clone(),
            env: self.env.clone(),
            body_limit: self.body_limit,
        };

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(TraceLayer::new_for_http())
    }
}

/// Local server for the functions of one project
pub struct FunctionsServer {
    project_root: PathBuf,
    config: Config,
    compiler: Option<Arc<dyn HandlerCompiler>>,
    state: Lifecycle,
}

impl FunctionsServer {
    /// Server for `project_root` with default configuration
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config: Config::default(),
            compiler: None,
            state: Lifecycle::Idle,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default subprocess compiler
    pub fn with_compiler(mut self, compiler: impl HandlerCompiler + 'static) -> Self {
        self.compiler = Some(Arc::new(compiler));
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn functions_dir(&self) -> PathBuf {
        self.project_root.join(&self.config.functions.dir)
    }

    fn transition(&mut self, next: Lifecycle) {
        debug!("Server state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn abort<T>(&mut self, e: ServeError) -> Result<T, ServeError> {
        error!("{}", e);
        self.transition(Lifecycle::Aborted);
        Err(e)
    }

    /// Discovers, validates and classifies functions
    ///
    /// Returns `None` when no eligible function exists.
    pub async fn prepare(&mut self) -> Result<Option<PreparedFunctions>, ServeError> {
        match self.try_prepare().await {
            Ok(prepared) => Ok(prepared),
            Err(e) => self.abort(e),
        }
    }

    async fn try_prepare(&mut self) -> Result<Option<PreparedFunctions>, ServeError> {
        let compiler = self
            .compiler
            .clone()
            .unwrap_or_else(|| Arc::new(CommandCompiler::from(&self.config.runtime)));

        let functions_dir = self.functions_dir();
        let resources =
            parse_function_resources(&functions_dir, &self.config.functions, compiler.as_ref()).await?;

        if resources.is_empty() {
            info!("No Serverless functions detected.");
            return Ok(None);
        }

        self.transition(Lifecycle::Validating);
        if self.config.routing.case_insensitive {
            validate_ignoring_case(&resources)?;
        } else {
            validate(&resources)?;
        }

        let group = classify(resources);
        for resource in group.iter() {
            info!("λ {}", resource.route_path);
        }

        let table = RouteTable::from(group).with_case_insensitive(self.config.routing.case_insensitive);
        let env = FunctionEnv::load(self.project_root.join(&self.config.functions.env_file))?;

        Ok(Some(PreparedFunctions {
            table: Arc::new(table),
            env,
            body_limit: self.config.routing.body_limit,
        }))
    }

    /// Prepares and serves until the process is stopped
    pub async fn serve(self) -> Result<ServeOutcome, ServeError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Prepares and serves until `signal` resolves
    pub async fn serve_with_shutdown<F>(mut self, signal: F) -> Result<ServeOutcome, ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.bind().await? {
            Some(bound) => bound.serve_with_shutdown(signal).await,
            None => Ok(ServeOutcome::NoFunctions),
        }
    }

    /// Prepares and binds the listener without accepting connections yet
    ///
    /// Returns `None` when no eligible function exists; no port is bound then.
    pub async fn bind(&mut self) -> Result<Option<BoundFunctions>, ServeError> {
        let Some(prepared) = self.prepare().await? else {
            return Ok(None);
        };

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let addr: SocketAddr = match addr.parse() {
            Ok(addr) => addr,
            Err(_) => return self.abort(ServeError::Address { addr }),
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => return self.abort(ServeError::Bind { addr, source }),
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => return self.abort(ServeError::Bind { addr, source }),
        };

        self.transition(Lifecycle::Listening);
        // Port 0 asks the OS for a free port, so report the one it picked
        info!("Serving on port {}", local_addr.port());

        Ok(Some(BoundFunctions {
            listener,
            local_addr,
            router: prepared.router(),
        }))
    }
}

/// A bound listener with its routes, ready to accept connections
pub struct BoundFunctions {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
}

impl BoundFunctions {
    /// Address actually bound, including an OS-assigned port
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `signal` resolves
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<ServeOutcome, ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(ServeError::Serve)?;

        Ok(ServeOutcome::Stopped)
    }
}

/// Serves the functions under `<project_root>/functions` on `port`
///
/// Reads `launch.toml` from the project root when present.
pub async fn serve_functions(project_root: impl AsRef<Path>, port: u16) -> anyhow::Result<ServeOutcome> {
    let project_root = project_root.as_ref();
    let config = Config::load_from_project(project_root)?;

    let outcome = FunctionsServer::new(project_root)
        .with_config(config)
        .with_port(port)
        .serve()
        .await?;

    Ok(outcome)
}
