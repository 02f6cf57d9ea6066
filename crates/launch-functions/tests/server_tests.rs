//! Integration tests for launch-functions
//!
//! Organized by feature area:
//! - Startup (no functions, missing directory, validation and compile failures)
//! - Discovery filters
//! - Routing precedence and matching
//! - Middleware (body parsing, cache-control)
//! - Fault isolation
//! - Environment

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use launch_functions::*;
use launch_router::ValidationError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tower::ServiceExt;

// ============================================================================
// Helpers
// ============================================================================

/// Creates `<tmp>/functions/<file>` for every relative file
fn project(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let functions = dir.path().join("functions");
    fs::create_dir_all(&functions).unwrap();

    for file in files {
        let path = functions.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "export default (req, res) => {}\n").unwrap();
    }

    dir
}

fn text(body: &'static str) -> SharedHandler {
    handler_fn(move |_req, _env| async move { Ok(FunctionResponse::text(body)) })
}

async fn prepare(dir: &Path, compiler: RegistryCompiler) -> PreparedFunctions {
    FunctionsServer::new(dir)
        .with_compiler(compiler)
        .prepare()
        .await
        .unwrap()
        .expect("functions were discovered")
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

async fn send(router: &Router, request: Request<Body>) -> Reply {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    Reply {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn get(router: &Router, uri: &str) -> Reply {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(router: &Router, uri: &str, content_type: &str, body: &'static str) -> Reply {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_no_functions_returns_without_binding() {
    let dir = project(&[]);
    let outcome = FunctionsServer::new(dir.path())
        .with_compiler(RegistryCompiler::new())
        .serve()
        .await
        .unwrap();

    assert_eq!(outcome, ServeOutcome::NoFunctions);
}

#[tokio::test]
async fn test_only_ineligible_files_means_no_functions() {
    let dir = project(&["[proxy].edge.js", "notes.md"]);
    let compiler = RegistryCompiler::new()
        .register("[proxy].edge.js", text("proxy"))
        .register("notes.md", text("notes"));

    let mut server = FunctionsServer::new(dir.path()).with_compiler(compiler);
    assert!(server.prepare().await.unwrap().is_none());
    assert_eq!(server.state(), Lifecycle::Idle);
}

#[tokio::test]
async fn test_missing_functions_directory_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = FunctionsServer::new(dir.path()).with_compiler(RegistryCompiler::new());

    let result = server.prepare().await;
    assert!(matches!(result, Err(ServeError::FunctionsDirectoryNotFound { .. })));
    assert_eq!(server.state(), Lifecycle::Aborted);
}

#[tokio::test]
async fn test_validation_error_aborts_before_binding() {
    let dir = project(&["health.js", "[id].js"]);
    let compiler = RegistryCompiler::new()
        .register("health.js", text("ok"))
        .register("[id].js", text("id"));

    let mut server = FunctionsServer::new(dir.path()).with_compiler(compiler);
    let result = server.prepare().await;

    assert!(matches!(
        result,
        Err(ServeError::Validation(ValidationError::TopLevelDynamicRoute { .. }))
    ));
    assert_eq!(server.state(), Lifecycle::Aborted);
}

#[tokio::test]
async fn test_same_level_conflict_aborts_serve() {
    let dir = project(&["a/[id].js", "a/[slug].js"]);
    let compiler = RegistryCompiler::new()
        .register("a/[id].js", text("id"))
        .register("a/[slug].js", text("slug"));

    let result = FunctionsServer::new(dir.path()).with_compiler(compiler).serve().await;
    assert!(matches!(
        result,
        Err(ServeError::Validation(ValidationError::ExistingDynamicRouteAtSameLevel { .. }))
    ));
}

struct BrokenCompiler;

#[async_trait]
impl HandlerCompiler for BrokenCompiler {
    async fn compile(&self, _source_path: &Path) -> anyhow::Result<Option<SharedHandler>> {
        anyhow::bail!("runtime unavailable")
    }
}

#[tokio::test]
async fn test_compile_failure_aborts() {
    let dir = project(&["hello.js"]);
    let mut server = FunctionsServer::new(dir.path()).with_compiler(BrokenCompiler);

    match server.prepare().await {
        Err(ServeError::Compile { path, source }) => {
            assert!(path.ends_with("functions/hello.js"));
            assert_eq!(source.to_string(), "runtime unavailable");
        }
        Err(other) => panic!("expected Compile, got {:?}", other),
        Ok(_) => panic!("expected Compile, got success"),
    }
}

#[tokio::test]
async fn test_bind_failure_aborts() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let dir = project(&["hello.js"]);
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();

    let result = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_port(port)
        .with_compiler(RegistryCompiler::new().register("hello.js", text("hi")))
        .serve()
        .await;

    assert!(matches!(result, Err(ServeError::Bind { .. })));
}

#[tokio::test]
async fn test_invalid_host_aborts() {
    let dir = project(&["hello.js"]);
    let mut config = Config::default();
    config.server.host = "not a host".to_string();

    let result = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("hello.js", text("hi")))
        .serve()
        .await;

    assert!(matches!(result, Err(ServeError::Address { .. })));
}

#[tokio::test]
async fn test_serve_until_shutdown() {
    let dir = project(&["hello.js"]);
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;

    let outcome = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("hello.js", text("hi")))
        .serve_with_shutdown(async {})
        .await
        .unwrap();

    assert_eq!(outcome, ServeOutcome::Stopped);
}

#[tokio::test]
async fn test_bind_reports_the_assigned_port() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let dir = project(&["hello.js"]);
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;

    let mut server = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("hello.js", text("hi")));
    let bound = server.bind().await.unwrap().expect("functions were discovered");
    let addr = bound.local_addr();
    assert_ne!(addr.port(), 0);
    assert_eq!(server.state(), Lifecycle::Listening);

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let serving = tokio::spawn(bound.serve_with_shutdown(async {
        let _ = stopped.await;
    }));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {}", raw);
    assert!(raw.ends_with("hi"), "unexpected response: {}", raw);

    stop.send(()).unwrap();
    assert_eq!(serving.await.unwrap().unwrap(), ServeOutcome::Stopped);
}

#[tokio::test]
async fn test_bind_without_functions_binds_nothing() {
    let dir = project(&[]);
    let mut server = FunctionsServer::new(dir.path());
    assert!(server.bind().await.unwrap().is_none());
    assert_eq!(server.state(), Lifecycle::Idle);
}

#[tokio::test]
async fn test_case_folded_parents_conflict_by_default() {
    let dir = project(&["Users/[id].js", "users/[slug].js"]);
    let compiler = RegistryCompiler::new()
        .register("Users/[id].js", text("id"))
        .register("users/[slug].js", text("slug"));

    let mut server = FunctionsServer::new(dir.path()).with_compiler(compiler);
    assert!(matches!(
        server.prepare().await,
        Err(ServeError::Validation(ValidationError::ExistingDynamicRouteAtSameLevel { .. }))
    ));
    assert_eq!(server.state(), Lifecycle::Aborted);
}

#[tokio::test]
async fn test_case_sensitive_config_keeps_case_distinct_parents() {
    let dir = project(&["Users/[id].js", "users/[slug].js"]);
    let compiler = RegistryCompiler::new()
        .register("Users/[id].js", text("id"))
        .register("users/[slug].js", text("slug"));
    let mut config = Config::default();
    config.routing.case_insensitive = false;

    let router = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(compiler)
        .prepare()
        .await
        .unwrap()
        .unwrap()
        .router();

    assert_eq!(get(&router, "/Users/1").await.body, "id");
    assert_eq!(get(&router, "/users/1").await.body, "slug");
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_routes_are_registered_exact_first() {
    let dir = project(&["users/[id].js", "users.js", "users/[id]/posts.js", "health.js"]);
    let compiler = RegistryCompiler::new()
        .register("users/[id].js", text("user"))
        .register("users.js", text("users"))
        .register("users/[id]/posts.js", text("posts"))
        .register("health.js", text("ok"));

    let prepared = prepare(dir.path(), compiler).await;
    assert_eq!(
        prepared.routes().collect::<Vec<_>>(),
        vec!["/health", "/users", "/users/:id", "/users/:id/posts"]
    );
}

#[tokio::test]
async fn test_nested_file_gets_its_own_handler() {
    let dir = project(&["hello.js", "a/hello.js"]);
    let compiler = RegistryCompiler::new()
        .register("hello.js", text("top"))
        .register("a/hello.js", text("nested"));
    let router = prepare(dir.path(), compiler).await.router();

    assert_eq!(get(&router, "/hello").await.body, "top");
    assert_eq!(get(&router, "/a/hello").await.body, "nested");
}

#[tokio::test]
async fn test_unexported_and_ineligible_files_are_skipped() {
    let dir = project(&["hello.js", "helper.js", "[proxy].edge.js", "types.ts"]);
    let compiler = RegistryCompiler::new()
        .register("hello.js", text("hi"))
        .register("[proxy].edge.js", text("proxy"))
        .register("types.ts", text("types"));

    let prepared = prepare(dir.path(), compiler).await;
    assert_eq!(prepared.routes().collect::<Vec<_>>(), vec!["/hello"]);
}

#[tokio::test]
async fn test_custom_functions_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("api")).unwrap();
    fs::write(dir.path().join("api/ping.js"), "export default 1").unwrap();

    let mut config = Config::default();
    config.functions.dir = "api".to_string();

    let prepared = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("ping.js", text("pong")))
        .prepare()
        .await
        .unwrap()
        .unwrap();

    let router = prepared.router();
    assert_eq!(get(&router, "/ping").await.body, "pong");
}

#[tokio::test]
async fn test_default_compiler_uses_export_detection() {
    let dir = project(&["hello.js"]);
    fs::write(dir.path().join("functions/helper.js"), "const x = 1;\n").unwrap();

    let prepared = FunctionsServer::new(dir.path()).prepare().await.unwrap().unwrap();
    assert_eq!(prepared.routes().collect::<Vec<_>>(), vec!["/hello"]);
}

fn node_available() -> bool {
    std::process::Command::new("node")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_default_compiler_calls_the_default_export() {
    if !node_available() {
        eprintln!("node not found, skipping");
        return;
    }

    let dir = project(&[]);
    let functions = dir.path().join("functions");
    fs::write(functions.join("created.js"), "export default (req, res) => res.status(201).send('x')\n").unwrap();
    fs::create_dir_all(functions.join("users")).unwrap();
    fs::write(
        functions.join("users/[id].js"),
        "module.exports = (req, res) => res.json({ id: req.params.id, q: req.query.q })\n",
    )
    .unwrap();

    let router = FunctionsServer::new(dir.path()).prepare().await.unwrap().unwrap().router();

    let reply = get(&router, "/created").await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body, "x");

    let reply = get(&router, "/users/7?q=all").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(reply.body, r#"{"id":"7","q":"all"}"#);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_exact_route_wins_over_dynamic() {
    let dir = project(&["users.js", "users/[id].js"]);
    let compiler = RegistryCompiler::new()
        .register("users.js", text("list"))
        .register(
            "users/[id].js",
            handler_fn(|req, _env| async move {
                Ok(FunctionResponse::text(format!("user {}", req.param("id").unwrap_or("?"))))
            }),
        );

    let router = prepare(dir.path(), compiler).await.router();

    assert_eq!(get(&router, "/users").await.body, "list");
    assert_eq!(get(&router, "/users/42").await.body, "user 42");
    assert_eq!(get(&router, "/users/a%20b").await.body, "user a b");
}

#[tokio::test]
async fn test_matching_ignores_case_and_trailing_slash() {
    let dir = project(&["hello.js"]);
    let router = prepare(dir.path(), RegistryCompiler::new().register("hello.js", text("hi")))
        .await
        .router();

    assert_eq!(get(&router, "/HELLO").await.status, StatusCode::OK);
    assert_eq!(get(&router, "/hello/").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_case_sensitive_matching_when_configured() {
    let dir = project(&["hello.js"]);
    let mut config = Config::default();
    config.routing.case_insensitive = false;

    let prepared = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("hello.js", text("hi")))
        .prepare()
        .await
        .unwrap()
        .unwrap();

    let router = prepared.router();
    assert_eq!(get(&router, "/HELLO").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&router, "/hello").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unmatched_path_is_not_found() {
    let dir = project(&["hello.js"]);
    let router = prepare(dir.path(), RegistryCompiler::new().register("hello.js", text("hi")))
        .await
        .router();

    let reply = get(&router, "/missing").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn test_every_method_is_accepted() {
    let dir = project(&["echo.js"]);
    let echo = handler_fn(|req, _env| async move { Ok(FunctionResponse::text(req.method.to_string())) });
    let router = prepare(dir.path(), RegistryCompiler::new().register("echo.js", echo))
        .await
        .router();

    for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/echo")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&router, request).await.body, method.as_str());
    }
}

#[tokio::test]
async fn test_query_parameters_reach_the_handler() {
    let dir = project(&["search.js"]);
    let search = handler_fn(|req, _env| async move {
        Ok(FunctionResponse::text(format!(
            "{}|{}",
            req.query("q").unwrap_or(""),
            req.query("page").unwrap_or("")
        )))
    });
    let router = prepare(dir.path(), RegistryCompiler::new().register("search.js", search))
        .await
        .router();

    assert_eq!(get(&router, "/search?q=rust+lang&page=2").await.body, "rust lang|2");
}

// ============================================================================
// Middleware
// ============================================================================

fn body_echo() -> SharedHandler {
    handler_fn(|req, _env| async move { Ok(FunctionResponse::json(&req.body.to_json())) })
}

#[tokio::test]
async fn test_json_body_is_parsed() {
    let dir = project(&["echo.js"]);
    let router = prepare(dir.path(), RegistryCompiler::new().register("echo.js", body_echo()))
        .await
        .router();

    let reply = post(&router, "/echo", "application/json", r#"{"name":"ada"}"#).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, r#"{"name":"ada"}"#);
}

#[tokio::test]
async fn test_form_body_is_parsed() {
    let dir = project(&["echo.js"]);
    let router = prepare(dir.path(), RegistryCompiler::new().register("echo.js", body_echo()))
        .await
        .router();

    let reply = post(&router, "/echo", "application/x-www-form-urlencoded", "name=ada+lovelace").await;
    assert_eq!(reply.body, r#"{"name":"ada lovelace"}"#);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let dir = project(&["echo.js"]);
    let router = prepare(dir.path(), RegistryCompiler::new().register("echo.js", body_echo()))
        .await
        .router();

    let reply = post(&router, "/echo", "application/json", "{broken").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let dir = project(&["echo.js"]);
    let mut config = Config::default();
    config.routing.body_limit = 4;

    let prepared = FunctionsServer::new(dir.path())
        .with_config(config)
        .with_compiler(RegistryCompiler::new().register("echo.js", body_echo()))
        .prepare()
        .await
        .unwrap()
        .unwrap();

    let reply = post(&prepared.router(), "/echo", "text/plain", "too long").await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cache_control_defaults_to_no_store() {
    let dir = project(&["plain.js", "cached.js"]);
    let cached = handler_fn(|_req, _env| async {
        Ok(FunctionResponse::text("cached").with_header("cache-control", "max-age=60"))
    });
    let compiler = RegistryCompiler::new()
        .register("plain.js", text("plain"))
        .register("cached.js", cached);
    let router = prepare(dir.path(), compiler).await.router();

    assert_eq!(get(&router, "/plain").await.headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(get(&router, "/cached").await.headers[header::CACHE_CONTROL], "max-age=60");
}

// ============================================================================
// Fault isolation
// ============================================================================

#[tokio::test]
async fn test_failing_handlers_do_not_take_down_the_server() {
    let dir = project(&["fails.js", "panics.js", "works.js"]);
    let fails = handler_fn(|_req, _env| async {
        Err::<FunctionResponse, _>(anyhow::anyhow!("database unreachable"))
    });
    let panics = handler_fn(|_req, _env| async {
        if true {
            panic!("handler exploded");
        }
        Ok(FunctionResponse::text("unreachable"))
    });
    let compiler = RegistryCompiler::new()
        .register("fails.js", fails)
        .register("panics.js", panics)
        .register("works.js", text("fine"));
    let router = prepare(dir.path(), compiler).await.router();

    let reply = get(&router, "/fails").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "");

    let reply = get(&router, "/panics").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "");

    let reply = get(&router, "/works").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "fine");

    // The failing route keeps failing independently and is not retried
    assert_eq!(get(&router, "/panics").await.status, StatusCode::INTERNAL_SERVER_ERROR);
}

/// Panics while building its future, before anything is awaited
struct EagerPanic;

impl FunctionHandler for EagerPanic {
    fn call<'life0, 'async_trait>(
        &'life0 self,
        _request: FunctionRequest,
        _env: FunctionEnv,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<FunctionResponse>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        panic!("handler blew up before returning a future")
    }
}

#[tokio::test]
async fn test_handler_panicking_on_call_is_contained() {
    let dir = project(&["eager.js", "works.js"]);
    let compiler = RegistryCompiler::new()
        .register("eager.js", Arc::new(EagerPanic))
        .register("works.js", text("fine"));
    let router = prepare(dir.path(), compiler).await.router();

    let reply = get(&router, "/eager").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "");

    assert_eq!(get(&router, "/works").await.body, "fine");
}

// ============================================================================
// Environment
// ============================================================================

#[tokio::test]
async fn test_env_file_is_exposed_to_handlers() {
    let dir = project(&["env.js"]);
    fs::write(dir.path().join(".env.local"), "LAUNCH_IT_SECRET=s3cret\n").unwrap();

    let env = handler_fn(|_req, env| async move {
        Ok(FunctionResponse::text(env.get("LAUNCH_IT_SECRET").unwrap_or("missing").to_string()))
    });
    let prepared = prepare(dir.path(), RegistryCompiler::new().register("env.js", env)).await;

    assert_eq!(prepared.env().get("LAUNCH_IT_SECRET"), Some("s3cret"));
    assert_eq!(get(&prepared.router(), "/env").await.body, "s3cret");
}

#[tokio::test]
async fn test_missing_env_file_is_fine() {
    let dir = project(&["env.js"]);
    let prepared = prepare(dir.path(), RegistryCompiler::new().register("env.js", text("ok"))).await;
    assert_eq!(prepared.env().get("LAUNCH_IT_SECRET"), None);
}

#[tokio::test]
async fn test_serve_functions_reads_project_config() {
    let dir = project(&[]);
    fs::write(dir.path().join("launch.toml"), "[functions]\ndir = \"functions\"\n").unwrap();

    let outcome = serve_functions(dir.path(), 3000).await.unwrap();
    assert_eq!(outcome, ServeOutcome::NoFunctions);
}
