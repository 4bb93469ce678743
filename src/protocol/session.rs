//! Stream sessions.
//!
//! One [`MediaStream`] per in-flight request. It owns the file handle and the
//! concurrency permit and gives both back as soon as it reaches `Completed` or
//! `Aborted`, or when the consumer drops it.

use std::io::{self, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::range::ByteRange;

/// Read size per pulled chunk.
const READ_CHUNK: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum StreamError {
  #[error("Failed to open media: {0}")]
  Open(#[source] io::Error),
  #[error("Read failed after {delivered} bytes: {source}")]
  Io {
    delivered: u64,
    #[source]
    source: io::Error,
  },
  #[error("Stream ended early: {delivered} of {expected} bytes")]
  Truncated { expected: u64, delivered: u64 },
}

/// Lifecycle of a media request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Received,
  Validated,
  Streaming,
  Completed,
  Aborted,
}

impl SessionState {
  pub fn is_finished(self) -> bool {
    matches!(self, SessionState::Completed | SessionState::Aborted)
  }
}

/// Pull-based byte stream over one range of a file.
///
/// Nothing is read until the consumer polls, so a slow consumer never causes
/// data to pile up in memory. A clean end is `None` after exactly
/// `range.len()` bytes; any failure is a single `Some(Err(_))` before `None`.
pub struct MediaStream {
  id: Uuid,
  state: SessionState,
  reader: Option<ReaderStream<Take<File>>>,
  permit: Option<OwnedSemaphorePermit>,
  expected: u64,
  delivered: u64,
}

impl MediaStream {
  /// Open `path` and position it at `range.start`.
  pub async fn open(
    id: Uuid,
    path: &Path,
    range: ByteRange,
    permit: Option<OwnedSemaphorePermit>,
  ) -> Result<Self, StreamError> {
    let mut file = File::open(path).await.map_err(StreamError::Open)?;
    file
      .seek(SeekFrom::Start(range.start))
      .await
      .map_err(StreamError::Open)?;

    let expected = range.len();
    let reader = ReaderStream::with_capacity(file.take(expected), READ_CHUNK);
    log::debug!(
      "Session {} streaming {:?} bytes {}-{}",
      id,
      path,
      range.start,
      range.end
    );

    Ok(Self {
      id,
      state: SessionState::Streaming,
      reader: Some(reader),
      permit,
      expected,
      delivered: 0,
    })
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn delivered(&self) -> u64 {
    self.delivered
  }

  pub fn expected(&self) -> u64 {
    self.expected
  }

  /// Close the handle and release the permit.
  fn finish(&mut self, state: SessionState) {
    self.reader = None;
    self.permit = None;
    self.state = state;
    log::debug!(
      "Session {} {:?} after {}/{} bytes",
      self.id,
      state,
      self.delivered,
      self.expected
    );
  }
}

impl Stream for MediaStream {
  type Item = Result<Bytes, StreamError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    let Some(reader) = this.reader.as_mut() else {
      return Poll::Ready(None);
    };

    match ready!(Pin::new(reader).poll_next(cx)) {
      Some(Ok(chunk)) => {
        this.delivered += chunk.len() as u64;
        if this.delivered >= this.expected {
          this.finish(SessionState::Completed);
        }
        Poll::Ready(Some(Ok(chunk)))
      }
      Some(Err(source)) => {
        let delivered = this.delivered;
        this.finish(SessionState::Aborted);
        log::warn!("Session {} read error: {}", this.id, source);
        Poll::Ready(Some(Err(StreamError::Io { delivered, source })))
      }
      None if this.delivered >= this.expected => {
        this.finish(SessionState::Completed);
        Poll::Ready(None)
      }
      None => {
        let (expected, delivered) = (this.expected, this.delivered);
        this.finish(SessionState::Aborted);
        log::warn!("Session {} truncated: {}/{} bytes", this.id, delivered, expected);
        Poll::Ready(Some(Err(StreamError::Truncated { expected, delivered })))
      }
    }
  }
}

impl Drop for MediaStream {
  fn drop(&mut self) {
    if !self.state.is_finished() {
      log::debug!(
        "Session {} cancelled by consumer after {} bytes",
        self.id,
        self.delivered
      );
      self.finish(SessionState::Aborted);
    }
  }
}
