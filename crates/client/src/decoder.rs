//! Camera boundary.
//!
//! The decoding primitive itself is an external collaborator; this module
//! defines the seam ([`FrameDecoder`]) and resolves whatever payload shape the
//! collaborator produces into a [`DecodeAttempt`] exactly once.

use std::io::BufRead;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use visitlog_core::scan::DecodeAttempt;

/// A frame the collaborator could not decode.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unreadable frame: {0}")]
    Unreadable(String),

    #[error("Frame source read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of decode attempts, one per call.
#[async_trait]
pub trait FrameDecoder: Send {
    /// Decode the next frame. `None` means the source has closed.
    async fn next_frame(&mut self) -> Option<Result<DecodeAttempt, DecodeError>>;
}

/// Line-oriented frame source (one line per frame).
///
/// Each line is either raw decoded text, a JSON payload (a string or an
/// object with a `text` field), a blank line for "no code in view", or
/// `{"error": "..."}` for a frame the decoder failed on.
pub struct LineFrameSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> LineFrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameDecoder for LineFrameSource<R> {
    async fn next_frame(&mut self) -> Option<Result<DecodeAttempt, DecodeError>> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(parse_frame_line(&line)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Line-oriented frame source over a blocking reader such as stdin.
///
/// Lines are read on a dedicated OS thread and handed over a channel. The
/// thread is never joined, so a read blocked on an idle terminal does not
/// hold up runtime shutdown.
pub struct ThreadedLineSource {
    lines: mpsc::Receiver<std::io::Result<String>>,
}

impl ThreadedLineSource {
    pub fn spawn<R>(reader: R) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("frame-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            })?;
        Ok(Self { lines: rx })
    }
}

#[async_trait]
impl FrameDecoder for ThreadedLineSource {
    async fn next_frame(&mut self) -> Option<Result<DecodeAttempt, DecodeError>> {
        match self.lines.recv().await? {
            Ok(line) => Some(parse_frame_line(&line)),
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Resolve one line of a frame feed.
pub fn parse_frame_line(line: &str) -> Result<DecodeAttempt, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(DecodeAttempt::Empty);
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) if map.contains_key("error") => {
            let reason = match &map["error"] {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(DecodeError::Unreadable(reason))
        }
        Ok(
            value @ (serde_json::Value::Object(_)
            | serde_json::Value::String(_)
            | serde_json::Value::Null),
        ) => Ok(DecodeAttempt::from_payload(value)),
        // Numbers, booleans, arrays and non-JSON lines are raw text.
        _ => Ok(DecodeAttempt::from_text(trimmed)),
    }
}
