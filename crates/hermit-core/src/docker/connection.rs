//! Persistent HTTP/1.1 connection to the image daemon's Unix socket.
//!
//! The daemon speaks plain HTTP over a local Unix domain socket, so the
//! connection is a `hyper` HTTP/1.1 client handshake on top of a
//! `UnixStream`. One connection carries one request at a time; the facade
//! enforces this by requiring `&mut` access for every round trip.

use std::io;
use std::path::Path;

use http_body_util::Full;
use hyper::Request;
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

/// A long-lived client connection to the daemon socket.
///
/// Opened lazily by the facade on first use and cached for the owning
/// instance's lifetime. A transport failure is surfaced to the caller of
/// the failing request; the connection is not reopened automatically.
pub struct DaemonConnection {
    sender: SendRequest<Full<Bytes>>,
}

impl DaemonConnection {
    /// Connect to the daemon socket and perform the HTTP/1.1 handshake.
    ///
    /// The hyper connection task is driven in the background for as long
    /// as the returned handle lives.
    pub async fn connect(socket_path: &Path) -> io::Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let io = TokioIo::new(stream);

        let (sender, conn) = http1::handshake::<_, Full<Bytes>>(io)
            .await
            .map_err(io::Error::other)?;

        // Drive the connection in the background
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                debug!(error = %err, "daemon connection task ended");
            }
        });

        debug!(path = %socket_path.display(), "connected to image daemon");
        Ok(Self { sender })
    }

    /// Send one request and await its response head.
    ///
    /// The response body is returned unread so callers can stream it.
    pub async fn request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> hyper::Result<hyper::Response<Incoming>> {
        self.sender.send_request(req).await
    }
}
