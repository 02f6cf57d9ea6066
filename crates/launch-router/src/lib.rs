//! # Launch Router
//!
//! The routing core of the local functions emulator. Files under a functions
//! directory map to URL routes:
//!
//! - `hello.js` → `/hello`
//! - `users/[id].js` → `/users/:id`
//! - `users/[id]/posts.js` → `/users/:id/posts`
//!
//! The crate is split into small pure pieces:
//!
//! - [`path`]: route derivation from file paths and request path normalization
//! - [`segment`]: parsing of a single `name` / `[name]` segment
//! - [`classify`]: exact vs dynamic grouping, order preserving
//! - [`validate`]: structural checks that reject ambiguous route sets
//! - [`RouteTable`]: first-match lookup in registration order
//!
//! ## Example
//!
//! ```
//! use launch_router::{classify, validate, RouteSource, RouteTable};
//! use std::path::{Path, PathBuf};
//!
//! #[derive(Debug)]
//! struct File(PathBuf, String);
//!
//! impl RouteSource for File {
//!     fn source_path(&self) -> &Path { &self.0 }
//!     fn route_path(&self) -> &str { &self.1 }
//!     fn with_route_path(self, route_path: String) -> Self { File(self.0, route_path) }
//! }
//!
//! let files = vec![
//!     File("users/[id].js".into(), "/users/[id]".into()),
//!     File("users.js".into(), "/users".into()),
//! ];
//!
//! validate(&files).unwrap();
//! let table = RouteTable::from(classify(files));
//!
//! assert_eq!(table.at("/users").unwrap().pattern, "/users");
//! assert_eq!(table.at("/users/9").unwrap().params.get("id"), Some(&"9".to_string()));
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod classify;
mod error;
pub mod path;
pub mod segment;
mod table;
pub mod validate;

pub use classify::{classify, RouteGroup, RouteSource};
pub use error::ValidationError;
pub use segment::{parse_segment, NamingIssue, Segment};
pub use table::{RouteMatch, RouteTable};
pub use validate::{validate, validate_ignoring_case};
