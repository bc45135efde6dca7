//! Image daemon client.
//!
//! Talks to the image daemon's HTTP REST API directly over its Unix
//! socket, without a daemon SDK: builds images from an archived build
//! context, inspects them, and deletes them. The API surface is pinned
//! to one historical daemon version; every request path carries the
//! [`API_PREFIX`].
//!
//! One [`ImageDaemon`] owns one lazily-opened connection and supports a
//! single in-flight request at a time. Callers that need concurrency
//! use one instance per caller.

pub mod archive;
pub mod connection;
pub mod stream;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Child;
use tracing::{debug, info};

use hermit_config::AppConfig;

use crate::exec;
use connection::DaemonConnection;

pub use stream::{BuildStatusEvent, StatusReader};

/// API version prefix on every request path. The build and images
/// endpoints must stay byte-compatible with this daemon version.
pub const API_PREFIX: &str = "/v1.13";

/// Boolean spellings the pinned daemon version is sent in query strings.
const QUERY_TRUE: &str = "True";
const QUERY_FALSE: &str = "False";

static SUCCESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Successfully built ([0-9a-f]+)").expect("hard-coded pattern compiles")
});

/// Errors from image daemon operations.
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    /// The docker executable or the daemon socket is unreachable.
    #[error("image daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// Transport failure mid-request or mid-response.
    #[error("daemon connection failed: {0}")]
    Connection(String),

    /// Disk or archive-write failure while assembling the build context.
    #[error("failed to archive build context: {0}")]
    Archive(#[source] std::io::Error),

    /// Request construction failed before anything was sent.
    #[error("failed to construct daemon request: {0}")]
    Request(#[from] hyper::http::Error),

    /// The daemon answered the build request with a non-success status.
    #[error("image build failed with status {status}: {reason}")]
    BuildFailed { status: u16, reason: String },

    /// The daemon reported a build error mid-stream, or sent a status
    /// value of a shape this client does not recognize.
    #[error("build error: {message}")]
    DaemonReportedBuildError { message: String, remainder: String },

    /// The build reported success but the transcript carries no success
    /// marker, or the marker does not resolve to an image.
    #[error("unexpected build output:\n{0}")]
    UnexpectedBuildOutput(String),

    /// A response decoded as JSON but not as the expected shape.
    #[error("failed to decode daemon response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Delete refused: no such image.
    #[error("image {id} not found: {detail}")]
    ImageNotFound { id: String, detail: String },

    /// Delete refused: dependent containers exist.
    #[error("image {id} is in use by a container: {detail}")]
    ImageInUse { id: String, detail: String },

    /// Delete refused: the daemon reported an internal error.
    #[error("daemon internal error removing image {id}: {detail}")]
    DaemonInternalError { id: String, detail: String },

    /// Delegated docker client invocation failed.
    #[error("failed to execute docker client: {0}")]
    Exec(#[source] std::io::Error),
}

/// Options for [`ImageDaemon::build`]. Most map directly onto the
/// daemon's build query parameters.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Build context root. With `None`, the context holds only the
    /// optional Dockerfile override.
    pub source_directory: Option<PathBuf>,
    /// Let the daemon reuse cached layers.
    pub use_cache: bool,
    /// Remove intermediate containers after a successful build.
    pub remove_intermediate_containers: bool,
    /// Remove intermediate containers even when the build fails.
    pub force_remove: bool,
    /// Ask the daemon for quiet build output.
    pub quiet: bool,
    /// Tag for the built image.
    pub tag: Option<String>,
    /// Literal Dockerfile contents, superseding any on-disk Dockerfile
    /// at the context root.
    pub dockerfile: Option<String>,
    /// Suppress the daemon's transcript on the client side.
    pub quiet_client: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source_directory: None,
            use_cache: true,
            remove_intermediate_containers: true,
            force_remove: true,
            quiet: false,
            tag: None,
            dockerfile: None,
            quiet_client: false,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the build context root.
    pub fn with_source_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_directory = Some(dir.into());
        self
    }

    /// Builder: tag the built image.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder: supply literal Dockerfile contents.
    pub fn with_dockerfile(mut self, contents: impl Into<String>) -> Self {
        self.dockerfile = Some(contents.into());
        self
    }

    /// Builder: enable or disable the daemon's layer cache.
    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Builder: ask the daemon for quiet output.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Builder: suppress the transcript on the client side.
    pub fn with_quiet_client(mut self, quiet_client: bool) -> Self {
        self.quiet_client = quiet_client;
        self
    }
}

/// Properties of an image as reported by the daemon's inspect endpoint.
///
/// An opaque key/value record; the daemon's canonical identifier is
/// available through [`ImageProperties::id`] when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageProperties(serde_json::Map<String, serde_json::Value>);

impl ImageProperties {
    /// The daemon-native canonical image identifier.
    pub fn id(&self) -> Option<&str> {
        self.0.get("Id").and_then(serde_json::Value::as_str)
    }

    /// Look up an arbitrary property.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

/// Client facade for the image daemon.
///
/// Owns a single lazily-opened connection to the daemon socket. Not for
/// concurrent use: every operation takes `&mut self`, and callers that
/// need parallelism construct one instance per caller. A failed
/// connection is not reopened; construct a new instance to retry.
pub struct ImageDaemon {
    socket_path: PathBuf,
    docker_bin: PathBuf,
    connection: Option<DaemonConnection>,
}

impl ImageDaemon {
    /// Create a client for the daemon at `socket_path`, gate-checked
    /// against the docker client binary at `docker_bin`.
    pub fn new(socket_path: impl Into<PathBuf>, docker_bin: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            docker_bin: docker_bin.into(),
            connection: None,
        }
    }

    /// Create a client from the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.daemon.socket_path.as_str(),
            config.daemon.docker_bin.as_str(),
        )
    }

    /// Get the cached connection, establishing it on first use.
    ///
    /// The docker executable is verified before the first connect; any
    /// verification or connect failure is a
    /// [`DockerError::DaemonUnavailable`].
    async fn connection(&mut self) -> Result<&mut DaemonConnection, DockerError> {
        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => {
                exec::verify_executable(&self.docker_bin)
                    .await
                    .map_err(|err| DockerError::DaemonUnavailable(err.to_string()))?;
                DaemonConnection::connect(&self.socket_path)
                    .await
                    .map_err(|err| {
                        DockerError::DaemonUnavailable(format!(
                            "cannot connect to {}: {err}",
                            self.socket_path.display()
                        ))
                    })?
            }
        };
        Ok(self.connection.insert(conn))
    }

    /// Perform one request/response round trip.
    ///
    /// The single point where transport failures surface; they are
    /// re-raised as [`DockerError::Connection`], never as raw hyper
    /// errors.
    async fn round_trip(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, DockerError> {
        let conn = self.connection().await?;
        conn.request(req)
            .await
            .map_err(|err| DockerError::Connection(err.to_string()))
    }

    /// Build an image from the given options and return its canonical Id.
    ///
    /// The build context is archived synchronously into a scoped
    /// temporary buffer before any network I/O starts; the buffer is
    /// released on every exit path. Unless `quiet_client` is set, the
    /// daemon's transcript is logged while it streams in.
    pub async fn build(&mut self, options: &BuildOptions) -> Result<String, DockerError> {
        let exclude = match options.source_directory.as_deref() {
            Some(dir) => archive::read_exclude_patterns(dir).map_err(DockerError::Archive)?,
            None => Vec::new(),
        };

        // Unlinked temp file: reclaimed when the handle drops, archive
        // failure included.
        let mut context = tempfile::tempfile().map_err(DockerError::Archive)?;
        archive::archive_build_context(
            &mut context,
            options.source_directory.as_deref(),
            &exclude,
            options.dockerfile.as_deref(),
        )
        .map_err(DockerError::Archive)?;

        let mut payload = Vec::new();
        context
            .read_to_end(&mut payload)
            .map_err(DockerError::Archive)?;
        drop(context);

        let uri = format!("{API_PREFIX}/build?{}", build_query(options));
        debug!(uri = %uri, context_bytes = payload.len(), "sending build request");
        let req = request(Method::POST, uri, Bytes::from(payload))?;
        let response = self.round_trip(req).await?;
        let status = response.status();

        if !status.is_success() {
            if options.quiet_client {
                drain_body(response.into_body()).await?;
            } else {
                stream::read_stream(response.into_body(), log_event).await?;
            }
            return Err(DockerError::BuildFailed {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let transcript = if options.quiet_client {
            let bytes = drain_body(response.into_body()).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            stream::read_stream(response.into_body(), log_event).await?
        };

        let Some(short_id) = extract_short_image_id(&transcript).map(str::to_string) else {
            return Err(DockerError::UnexpectedBuildOutput(transcript));
        };

        debug!(short_id = %short_id, "resolving canonical image id");
        match self.image_properties(&short_id).await? {
            Some(properties) => match properties.id() {
                Some(id) => Ok(id.to_string()),
                None => Err(DockerError::UnexpectedBuildOutput(transcript)),
            },
            None => Err(DockerError::UnexpectedBuildOutput(transcript)),
        }
    }

    /// Inspect an image by tag or id.
    ///
    /// Returns `None` for any non-success status; only transport-level
    /// failures raise. Deleting has stricter semantics, see
    /// [`ImageDaemon::remove_image`].
    pub async fn image_properties(
        &mut self,
        image: &str,
    ) -> Result<Option<ImageProperties>, DockerError> {
        let uri = format!("{API_PREFIX}/images/{image}/json");
        let req = request(Method::GET, uri, Bytes::new())?;
        let response = self.round_trip(req).await?;

        if response.status() != StatusCode::OK {
            // Drain so the connection can carry the next request.
            drain_body(response.into_body()).await?;
            return Ok(None);
        }

        let bytes = drain_body(response.into_body()).await?;
        let properties = serde_json::from_slice(&bytes)?;
        Ok(Some(properties))
    }

    /// Delete an image by id.
    ///
    /// 404, 409, and 500 raise typed errors; every other status,
    /// success included, drains the response and returns normally.
    pub async fn remove_image(&mut self, id: &str) -> Result<(), DockerError> {
        let uri = format!("{API_PREFIX}/images/{id}");
        let req = request(Method::DELETE, uri, Bytes::new())?;
        let response = self.round_trip(req).await?;
        let status = response.status();

        let detail = drain_body(response.into_body()).await?;
        let detail = String::from_utf8_lossy(&detail).into_owned();

        match status.as_u16() {
            404 => Err(DockerError::ImageNotFound {
                id: id.to_string(),
                detail,
            }),
            409 => Err(DockerError::ImageInUse {
                id: id.to_string(),
                detail,
            }),
            500 => Err(DockerError::DaemonInternalError {
                id: id.to_string(),
                detail,
            }),
            _ => Ok(()),
        }
    }

    /// Run the docker client to completion, sharing the caller's
    /// terminal streams. Returns the exit code.
    pub async fn execute(&self, args: &[String], cwd: Option<&Path>) -> Result<i32, DockerError> {
        exec::run(&self.docker_bin, args, cwd)
            .await
            .map_err(DockerError::Exec)
    }

    /// Spawn the docker client in the background with detached standard
    /// streams and return the process handle immediately.
    pub fn execute_background(
        &self,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<Child, DockerError> {
        exec::run_background(&self.docker_bin, args, cwd).map_err(DockerError::Exec)
    }
}

/// Serialize build options as the daemon's query string.
///
/// Parameter order and boolean spelling are part of the pinned wire
/// format.
fn build_query(options: &BuildOptions) -> String {
    let mut query = format!(
        "q={}&nocache={}&rm={}&forcerm={}",
        bool_param(options.quiet),
        bool_param(!options.use_cache),
        bool_param(options.remove_intermediate_containers),
        bool_param(options.force_remove),
    );
    if let Some(tag) = &options.tag {
        query.push_str("&tag=");
        query.push_str(&urlencoding::encode(tag));
    }
    query
}

fn bool_param(value: bool) -> &'static str {
    if value { QUERY_TRUE } else { QUERY_FALSE }
}

fn request(method: Method, uri: String, body: Bytes) -> Result<Request<Full<Bytes>>, DockerError> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header(hyper::header::HOST, "localhost")
        .body(Full::new(body))?)
}

async fn drain_body(body: Incoming) -> Result<Bytes, DockerError> {
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|err| DockerError::Connection(err.to_string()))
}

fn log_event(event: &BuildStatusEvent) {
    match event {
        BuildStatusEvent::LogLine(text) | BuildStatusEvent::StatusLine(text) => {
            info!("{}", text.trim_end_matches('\n'));
        }
        // Aborting shapes never reach the event callback.
        BuildStatusEvent::ErrorDetail(_) | BuildStatusEvent::Unrecognized(_) => {}
    }
}

/// Find the short image id in a build transcript.
///
/// The daemon's only success signal is a "Successfully built <hex>"
/// line near the end of the transcript: the last non-blank line, or the
/// one before it. Kept in one place so it can be replaced if the daemon
/// ever exposes a structured build result.
fn extract_short_image_id(transcript: &str) -> Option<&str> {
    let lines: Vec<&str> = transcript
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    for candidate in lines.iter().rev().take(2) {
        if let Some(captures) = SUCCESS_PATTERN.captures(candidate) {
            return captures.get(1).map(|m| m.as_str());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermit_test_utils::daemon::{MockDaemon, Route};
    use pretty_assertions::assert_eq;

    /// A docker binary stand-in that makes the gate check pass.
    const DOCKER_OK: &str = "true";

    fn daemon_for(mock: &MockDaemon) -> ImageDaemon {
        ImageDaemon::new(mock.socket_path(), DOCKER_OK)
    }

    // ── Query serialization ───────────────────────────────────────────

    #[test]
    fn test_build_query_defaults() {
        let query = build_query(&BuildOptions::default());
        assert_eq!(query, "q=False&nocache=False&rm=True&forcerm=True");
    }

    #[test]
    fn test_build_query_flipped_booleans() {
        let options = BuildOptions::new().with_quiet(true).with_use_cache(false);
        let query = build_query(&options);
        assert_eq!(query, "q=True&nocache=True&rm=True&forcerm=True");
    }

    #[test]
    fn test_build_query_encodes_tag() {
        let options = BuildOptions::new().with_tag("repo/app:v1");
        let query = build_query(&options);
        assert_eq!(
            query,
            "q=False&nocache=False&rm=True&forcerm=True&tag=repo%2Fapp%3Av1"
        );
    }

    // ── Success marker extraction ─────────────────────────────────────

    #[test]
    fn test_extract_id_from_last_line() {
        let transcript = "Step 1/1 : FROM scratch\nSuccessfully built ab12ef34";
        assert_eq!(extract_short_image_id(transcript), Some("ab12ef34"));
    }

    #[test]
    fn test_extract_id_skips_trailing_blank_line() {
        let transcript = "Successfully built ab12ef34\n\n";
        assert_eq!(extract_short_image_id(transcript), Some("ab12ef34"));
    }

    #[test]
    fn test_extract_id_from_second_to_last_line() {
        let transcript = "Successfully built ab12ef34\ntagged latest";
        assert_eq!(extract_short_image_id(transcript), Some("ab12ef34"));
    }

    #[test]
    fn test_extract_id_ignores_earlier_lines() {
        let transcript = "Successfully built ab12ef34\nline\nline\nline";
        assert_eq!(extract_short_image_id(transcript), None);
    }

    #[test]
    fn test_extract_id_no_marker() {
        assert_eq!(extract_short_image_id("nothing to see"), None);
        assert_eq!(extract_short_image_id(""), None);
    }

    // ── Image properties ──────────────────────────────────────────────

    #[test]
    fn test_image_properties_id_accessor() {
        let properties: ImageProperties =
            serde_json::from_str(r#"{"Id":"sha256:feed","Size":42}"#).unwrap();
        assert_eq!(properties.id(), Some("sha256:feed"));
        assert_eq!(
            properties.get("Size").and_then(serde_json::Value::as_i64),
            Some(42)
        );
        assert!(properties.get("Missing").is_none());
    }

    // ── Facade against the scripted daemon ────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_build_resolves_canonical_id() {
        let transcript =
            br#"{"stream":"Step 1/1 : FROM scratch\n"}{"stream":"Successfully built ab12ef34\n"}"#;
        let mock = MockDaemon::start(vec![
            Route::post("/v1.13/build", 200, transcript.to_vec()),
            Route::get(
                "/v1.13/images/ab12ef34/json",
                200,
                br#"{"Id":"sha256:deadbeef"}"#.to_vec(),
            ),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        let id = daemon.build(&BuildOptions::default()).await.unwrap();
        assert_eq!(id, "sha256:deadbeef");

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].uri,
            "/v1.13/build?q=False&nocache=False&rm=True&forcerm=True"
        );
        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].uri, "/v1.13/images/ab12ef34/json");
    }

    #[tokio::test]
    async fn test_build_success_marker_on_fallback_line() {
        // The marker sits on the second-to-last non-blank line.
        let transcript = b"{\"stream\":\"Successfully built ab12ef34\\n\"}\n{\"status\":\"tagged\"}";
        let mock = MockDaemon::start(vec![
            Route::post("/v1.13/build", 200, transcript.to_vec()),
            Route::get(
                "/v1.13/images/ab12ef34/json",
                200,
                br#"{"Id":"sha256:cafe"}"#.to_vec(),
            ),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        let id = daemon.build(&BuildOptions::default()).await.unwrap();
        assert_eq!(id, "sha256:cafe");
    }

    #[tokio::test]
    async fn test_build_sends_tag_in_query() {
        let transcript = br#"{"stream":"Successfully built ab12ef34\n"}"#;
        let mock = MockDaemon::start(vec![
            Route::post("/v1.13/build", 200, transcript.to_vec()),
            Route::get(
                "/v1.13/images/ab12ef34/json",
                200,
                br#"{"Id":"sha256:cafe"}"#.to_vec(),
            ),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        let options = BuildOptions::new().with_tag("repo/app:v1");
        daemon.build(&options).await.unwrap();

        let requests = mock.requests();
        assert!(requests[0].uri.ends_with("&tag=repo%2Fapp%3Av1"));
    }

    #[tokio::test]
    async fn test_build_archives_context_with_exclusions() {
        use std::io::Cursor;

        let context = tempfile::TempDir::new().unwrap();
        std::fs::write(context.path().join("keep.txt"), "keep").unwrap();
        std::fs::write(context.path().join("skip.log"), "skip").unwrap();
        std::fs::write(context.path().join(".dockerignore"), "*.log\n").unwrap();

        let transcript = br#"{"stream":"Successfully built ab12ef34\n"}"#;
        let mock = MockDaemon::start(vec![
            Route::post("/v1.13/build", 200, transcript.to_vec()),
            Route::get(
                "/v1.13/images/ab12ef34/json",
                200,
                br#"{"Id":"sha256:cafe"}"#.to_vec(),
            ),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        let options = BuildOptions::new()
            .with_source_directory(context.path())
            .with_dockerfile("FROM scratch\n");
        daemon.build(&options).await.unwrap();

        // The recorded request body is the tar-format build context.
        let requests = mock.requests();
        let mut names = Vec::new();
        let mut archive = tar::Archive::new(Cursor::new(requests[0].body.clone()));
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, vec![".dockerignore", "Dockerfile", "keep.txt"]);
    }

    #[tokio::test]
    async fn test_build_failed_status() {
        let mock = MockDaemon::start(vec![Route::post(
            "/v1.13/build",
            500,
            br#"{"stream":"no dice\n"}"#.to_vec(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        match err {
            DockerError::BuildFailed { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_build_failed_status_quiet_client() {
        // Quiet clients drain the failure body without parsing it, so the
        // status error wins even over an errorDetail in the body.
        let mock = MockDaemon::start(vec![Route::post(
            "/v1.13/build",
            500,
            br#"{"errorDetail":{"message":"boom"}}"#.to_vec(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        let options = BuildOptions::new().with_quiet_client(true);
        let err = daemon.build(&options).await.unwrap_err();
        assert!(matches!(err, DockerError::BuildFailed { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_build_daemon_reported_error() {
        let mock = MockDaemon::start(vec![Route::post(
            "/v1.13/build",
            200,
            br#"{"stream":"Step 1\n"}{"errorDetail":{"message":"boom"}}"#.to_vec(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        match err {
            DockerError::DaemonReportedBuildError { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_build_unexpected_output() {
        let mock = MockDaemon::start(vec![Route::post(
            "/v1.13/build",
            200,
            br#"{"stream":"nothing here\n"}"#.to_vec(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, DockerError::UnexpectedBuildOutput(_)));
    }

    #[tokio::test]
    async fn test_build_unexpected_output_when_id_does_not_resolve() {
        // Success marker present, but the inspect that should resolve the
        // short id comes back empty-handed.
        let transcript = br#"{"stream":"Successfully built ab12ef34\n"}"#;
        let mock = MockDaemon::start(vec![
            Route::post("/v1.13/build", 200, transcript.to_vec()),
            Route::get("/v1.13/images/ab12ef34/json", 404, Vec::new()),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, DockerError::UnexpectedBuildOutput(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_remove_image_status_mapping() {
        let mock = MockDaemon::start(vec![
            Route::delete("/v1.13/images/gone", 404, b"no such image".to_vec()),
            Route::delete("/v1.13/images/held", 409, b"container depends on it".to_vec()),
            Route::delete("/v1.13/images/broken", 500, b"daemon fell over".to_vec()),
            Route::delete("/v1.13/images/fine", 200, Vec::new()),
        ])
        .await;

        let mut daemon = daemon_for(&mock);

        let err = daemon.remove_image("gone").await.unwrap_err();
        assert!(matches!(err, DockerError::ImageNotFound { .. }));

        let err = daemon.remove_image("held").await.unwrap_err();
        match err {
            DockerError::ImageInUse { id, detail } => {
                assert_eq!(id, "held");
                assert_eq!(detail, "container depends on it");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = daemon.remove_image("broken").await.unwrap_err();
        assert!(matches!(err, DockerError::DaemonInternalError { .. }));

        daemon.remove_image("fine").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_image_tolerates_other_statuses() {
        let mock = MockDaemon::start(vec![Route::delete(
            "/v1.13/images/odd",
            418,
            Vec::new(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        daemon.remove_image("odd").await.unwrap();
    }

    #[tokio::test]
    async fn test_image_properties_found() {
        let mock = MockDaemon::start(vec![Route::get(
            "/v1.13/images/app/json",
            200,
            br#"{"Id":"sha256:feed","Architecture":"amd64"}"#.to_vec(),
        )])
        .await;

        let mut daemon = daemon_for(&mock);
        let properties = daemon.image_properties("app").await.unwrap().unwrap();
        assert_eq!(properties.id(), Some("sha256:feed"));
        assert_eq!(
            properties
                .get("Architecture")
                .and_then(serde_json::Value::as_str),
            Some("amd64")
        );
    }

    #[tokio::test]
    async fn test_image_properties_absent_on_any_failure_status() {
        let mock = MockDaemon::start(vec![
            Route::get("/v1.13/images/missing/json", 404, b"no such image".to_vec()),
            Route::get("/v1.13/images/flaky/json", 500, Vec::new()),
        ])
        .await;

        let mut daemon = daemon_for(&mock);
        assert!(daemon.image_properties("missing").await.unwrap().is_none());
        assert!(daemon.image_properties("flaky").await.unwrap().is_none());
    }

    // ── Availability gate ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_unavailable_when_executable_fails() {
        let mock = MockDaemon::start(vec![]).await;

        // `false version` exits nonzero, so the gate check refuses to
        // connect at all.
        let mut daemon = ImageDaemon::new(mock.socket_path(), "false");
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, DockerError::DaemonUnavailable(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_when_socket_missing() {
        let mut daemon = ImageDaemon::new("/nonexistent/hermit.sock", DOCKER_OK);
        let err = daemon.build(&BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, DockerError::DaemonUnavailable(_)));
    }

    // ── Delegated client execution ────────────────────────────────────

    #[tokio::test]
    async fn test_execute_returns_exit_code() {
        let daemon = ImageDaemon::new("/tmp/unused.sock", "true");
        let code = daemon.execute(&[], None).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_execute_background_returns_handle() {
        let daemon = ImageDaemon::new("/tmp/unused.sock", "sleep");
        let mut child = daemon
            .execute_background(&["0".to_string()], None)
            .unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());
    }
}
