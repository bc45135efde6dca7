#![deny(unsafe_code)]

//! Hermit core runtime.
//!
//! Implements the image-daemon client that the CLI drives: a persistent
//! HTTP/1.1 connection over the daemon's Unix socket, a tar build-context
//! archiver, an incremental reader for the daemon's streamed build status,
//! and the image build/inspect/delete facade on top of them.

/// Image daemon client: connection, archiving, status streaming, facade.
pub mod docker;
/// Helpers for running the docker client and other foreign executables.
pub mod exec;

pub use docker::{BuildOptions, BuildStatusEvent, DockerError, ImageDaemon, ImageProperties};
