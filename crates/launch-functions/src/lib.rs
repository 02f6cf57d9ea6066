//! # Launch Functions
//!
//! Local emulator for file-system-routed serverless functions.
//!
//! Startup walks `<project>/functions`, compiles every eligible `.js` file
//! through a [`HandlerCompiler`], rejects conflicting route sets, and serves the
//! rest over HTTP with exact routes ahead of dynamic ones. A handler that fails
//! or panics produces a `500` for that request only.
//!
//! ```no_run
//! use launch_functions::{FunctionsServer, ServeOutcome};
//!
//! # async fn run() -> Result<(), launch_functions::ServeError> {
//! match FunctionsServer::new(".").with_port(3000).serve().await? {
//!     ServeOutcome::NoFunctions => println!("No Serverless functions detected."),
//!     ServeOutcome::Stopped => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod compiler;
pub mod config;
mod dispatch;
pub mod env;
mod error;
pub mod handler;
pub mod resource;
mod server;
pub mod walker;

pub use command::CommandCompiler;
pub use compiler::{HandlerCompiler, RegistryCompiler};
pub use config::Config;
pub use env::FunctionEnv;
pub use error::ServeError;
pub use handler::{handler_fn, FunctionHandler, FunctionRequest, FunctionResponse, RequestBody, SharedHandler};
pub use resource::{parse_function_resources, FunctionResource};
pub use server::{serve_functions, BoundFunctions, FunctionsServer, Lifecycle, PreparedFunctions, ServeOutcome};
pub use walker::walk_functions;
