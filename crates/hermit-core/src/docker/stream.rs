//! Incremental reader for the daemon's streamed build status.
//!
//! During a build the daemon writes a sequence of JSON values back to
//! back, with no delimiter between them, terminated only by the end of
//! the response body. The reader accumulates the body one byte at a
//! time and attempts a full decode of the pending segment after every
//! byte; the first successful decode yields exactly one value, which is
//! classified by shape and dispatched as a [`BuildStatusEvent`].
//!
//! Re-parsing the pending segment on every byte is quadratic in the
//! length of a single status message. Individual messages are short, so
//! this is a known inefficiency rather than a correctness risk.

use bytes::Bytes;
use http_body_util::BodyExt;
use serde::Deserialize;

use super::DockerError;

/// One decoded value from the daemon's build status stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatusEvent {
    /// A `stream` value: a chunk of build log output.
    LogLine(String),
    /// A `status` value: a progress line.
    StatusLine(String),
    /// An `errorDetail` value: the daemon reports the build failed.
    ErrorDetail(String),
    /// A complete JSON value of any other shape, kept as raw text.
    Unrecognized(String),
}

/// Wire shape of a single status value, dispatched by which key is
/// present. `stream` wins over `status`; anything else that decodes
/// falls through to the catch-all.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Stream {
        stream: String,
    },
    Status {
        status: String,
    },
    Error {
        #[serde(rename = "errorDetail")]
        error_detail: RawErrorDetail,
    },
    Other(serde_json::Value),
}

#[derive(Deserialize)]
struct RawErrorDetail {
    message: String,
}

/// Byte-incremental decoder for undelimited concatenated JSON values.
///
/// Every pushed byte lands in both the pending segment and the
/// cumulative transcript. No event is ever emitted for an incomplete
/// segment; bytes that never complete a JSON value simply stay in the
/// transcript.
#[derive(Debug, Default)]
pub struct StatusReader {
    segment: Vec<u8>,
    transcript: Vec<u8>,
}

impl StatusReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a decoded event when the byte completes a
    /// JSON value, clearing the pending segment.
    pub fn push(&mut self, byte: u8) -> Option<BuildStatusEvent> {
        self.segment.push(byte);
        self.transcript.push(byte);

        let raw: RawStatus = serde_json::from_slice(&self.segment).ok()?;
        let event = match raw {
            RawStatus::Stream { stream } => BuildStatusEvent::LogLine(stream),
            RawStatus::Status { status } => BuildStatusEvent::StatusLine(status),
            RawStatus::Error { error_detail } => BuildStatusEvent::ErrorDetail(error_detail.message),
            RawStatus::Other(_) => {
                BuildStatusEvent::Unrecognized(String::from_utf8_lossy(&self.segment).into_owned())
            }
        };
        self.segment.clear();
        Some(event)
    }

    /// Consume the reader, returning everything received as text.
    pub fn into_transcript(self) -> String {
        String::from_utf8_lossy(&self.transcript).into_owned()
    }
}

/// Drive a response body through a [`StatusReader`], dispatching log and
/// status events to `on_event`.
///
/// An `errorDetail` value, or any value of unrecognized shape, aborts
/// reading immediately: the rest of the stream is drained into the
/// error and no event is emitted for the aborting segment's successors.
/// On normal end of stream the full transcript is returned as text.
pub async fn read_stream<B, F>(mut body: B, mut on_event: F) -> Result<String, DockerError>
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
    F: FnMut(&BuildStatusEvent),
{
    let mut reader = StatusReader::new();

    while let Some(next) = body.frame().await {
        let frame = next.map_err(|err| DockerError::Connection(err.to_string()))?;
        let Some(data) = frame.data_ref() else {
            continue;
        };

        for (offset, &byte) in data.iter().enumerate() {
            let Some(event) = reader.push(byte) else {
                continue;
            };
            match event {
                BuildStatusEvent::ErrorDetail(message) => {
                    let remainder = drain_remainder(&data[offset + 1..], body).await;
                    return Err(DockerError::DaemonReportedBuildError { message, remainder });
                }
                BuildStatusEvent::Unrecognized(raw) => {
                    let remainder = drain_remainder(&data[offset + 1..], body).await;
                    return Err(DockerError::DaemonReportedBuildError {
                        message: raw,
                        remainder,
                    });
                }
                event => on_event(&event),
            }
        }
    }

    Ok(reader.into_transcript())
}

/// Collect whatever is left of an aborted stream as text.
async fn drain_remainder<B>(tail: &[u8], body: B) -> String
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let mut remainder = tail.to_vec();
    if let Ok(collected) = body.collect().await {
        remainder.extend_from_slice(&collected.to_bytes());
    }
    String::from_utf8_lossy(&remainder).into_owned()
}
