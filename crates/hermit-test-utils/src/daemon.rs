//! Scripted mock image daemon.
//!
//! Serves canned HTTP responses over a real Unix socket in a temp
//! directory, so client code can be exercised end to end without a
//! running daemon. Every request is recorded for assertions, body
//! included.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// A scripted route: requests matching `method` and the `path` prefix
/// get the canned response.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Route {
    pub fn get(path: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self::new("GET", path, status, body)
    }

    pub fn post(path: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self::new("POST", path, status, body)
    }

    pub fn delete(path: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self::new("DELETE", path, status, body)
    }

    fn new(method: &str, path: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            method: method.to_string(),
            path: path.into(),
            status,
            body,
        }
    }
}

/// One request as the mock daemon saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub body: Vec<u8>,
}

/// A mock daemon listening on a Unix socket in an owned temp directory.
///
/// The socket directory is deleted and the accept task aborted when
/// this value is dropped, guaranteeing cleanup even on panic.
pub struct MockDaemon {
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_task: JoinHandle<()>,
    _temp_dir: TempDir,
}

impl MockDaemon {
    /// Bind a fresh socket and start serving the scripted routes.
    ///
    /// Unmatched requests get a bare 404.
    pub async fn start(routes: Vec<Route>) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&socket_path).expect("failed to bind mock socket");

        let routes = Arc::new(routes);
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let routes = routes.clone();
                let recorded = recorded.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let routes = routes.clone();
                        let recorded = recorded.clone();
                        async move { Ok::<_, Infallible>(respond(&routes, &recorded, req).await) }
                    });

                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        Self {
            socket_path,
            requests,
            accept_task,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the Unix socket the mock is listening on.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Everything received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .clone()
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn respond(
    routes: &[Route],
    recorded: &Mutex<Vec<RecordedRequest>>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    recorded
        .lock()
        .expect("request log poisoned")
        .push(RecordedRequest {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            body: body.to_vec(),
        });

    let matched = routes.iter().find(|route| {
        route.method == parts.method.as_str() && parts.uri.path().starts_with(&route.path)
    });

    match matched {
        Some(route) => Response::builder()
            .status(route.status)
            .body(Full::new(Bytes::from(route.body.clone())))
            .expect("static response"),
        None => Response::builder()
            .status(404)
            .body(Full::new(Bytes::new()))
            .expect("static response"),
    }
}
