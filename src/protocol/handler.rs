//! `media://` request handling.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::RwLock;
use tauri::http::{header, response::Builder, Method, Request, Response, StatusCode};
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::range::{parse_range, ByteRange, RangeRequest};
use super::reference::{resolve, ResolveError};
use super::session::{MediaStream, SessionState, StreamError};
use crate::config::AppConfig;
use crate::scope::MediaScope;

/// URI scheme registered with the webview.
pub const MEDIA_SCHEME: &str = "media";

/// Resource limits for media streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
  /// Sessions allowed to hold an open file at once.
  pub max_concurrent: usize,
  /// How long a request waits for a free session slot.
  pub queue_timeout: Duration,
  /// Upper bound on the body of a single response.
  pub max_chunk: u64,
}

impl Default for StreamLimits {
  fn default() -> Self {
    Self::from(&AppConfig::default())
  }
}

impl From<&AppConfig> for StreamLimits {
  fn from(config: &AppConfig) -> Self {
    Self {
      max_concurrent: config.max_concurrent_streams as usize,
      queue_timeout: Duration::from_millis(config.stream_queue_timeout_ms as u64),
      max_chunk: config.max_chunk_bytes as u64,
    }
  }
}

/// Serves `media://` requests.
///
/// Each response carries at most `max_chunk` bytes; the playback surface pulls
/// the rest with further `Range` requests, so memory per request stays bounded
/// whatever the file size.
pub struct MediaSchemeHandler {
  scope: Arc<MediaScope>,
  limits: RwLock<StreamLimits>,
  permits: RwLock<Arc<Semaphore>>,
}

impl MediaSchemeHandler {
  pub fn new(scope: Arc<MediaScope>, limits: StreamLimits) -> Self {
    Self {
      scope,
      permits: RwLock::new(Arc::new(Semaphore::new(limits.max_concurrent))),
      limits: RwLock::new(limits),
    }
  }

  /// Apply new limits. Sessions already running keep their old permit.
  pub fn configure(&self, limits: StreamLimits) {
    let mut current = self.limits.write();
    if current.max_concurrent != limits.max_concurrent {
      *self.permits.write() = Arc::new(Semaphore::new(limits.max_concurrent));
    }
    *current = limits;
  }

  pub fn limits(&self) -> StreamLimits {
    *self.limits.read()
  }

  /// Answer one request. Never fails: every outcome is a response.
  pub async fn respond(&self, request: &Request<Vec<u8>>) -> Response<Vec<u8>> {
    let id = Uuid::new_v4();
    let head_only = match *request.method() {
      Method::GET => false,
      Method::HEAD => true,
      _ => return plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
    };

    let mut state = SessionState::Received;
    log::debug!("Session {} {:?}: {}", id, state, request.uri());

    let media = match resolve(request.uri().path(), &self.scope).await {
      Ok(media) => media,
      Err(e) => {
        match &e {
          ResolveError::OutsideRoots(_) => log::warn!("Session {} rejected: {}", id, e),
          _ => log::debug!("Session {} rejected: {}", id, e),
        }
        return plain(StatusCode::NOT_FOUND, "File not found");
      }
    };
    state = SessionState::Validated;
    log::debug!("Session {} {:?}: {:?}", id, state, media.path);

    let limits = self.limits();
    let range_header = request
      .headers()
      .get(header::RANGE)
      .and_then(|value| value.to_str().ok());

    let (status, range) = match parse_range(range_header, media.size) {
      RangeRequest::Unsatisfiable => {
        return with_status(
          Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", media.size)),
          Vec::new(),
        );
      }
      RangeRequest::Full if media.size == 0 => (StatusCode::OK, None),
      RangeRequest::Full => {
        let whole = ByteRange {
          start: 0,
          end: media.size - 1,
        };
        if media.size <= limits.max_chunk {
          (StatusCode::OK, Some(whole))
        } else {
          // Webview media elements always send Range; on a 206 they keep
          // pulling the rest. Plain downloads get the first chunk only.
          (StatusCode::PARTIAL_CONTENT, Some(whole.capped(limits.max_chunk)))
        }
      }
      RangeRequest::Partial(range) => (StatusCode::PARTIAL_CONTENT, Some(range.capped(limits.max_chunk))),
    };

    let mut builder = Response::builder()
      .status(status)
      .header(header::CONTENT_TYPE, media.format.mime_type())
      .header(header::ACCEPT_RANGES, "bytes")
      .header(
        header::CONTENT_LENGTH,
        range.map_or(0, |r| r.len()).to_string(),
      );
    if let (StatusCode::PARTIAL_CONTENT, Some(range)) = (status, range) {
      builder = builder.header(header::CONTENT_RANGE, range.content_range(media.size));
    }

    let Some(range) = range.filter(|_| !head_only) else {
      return with_status(builder, Vec::new());
    };

    let permits = self.permits.read().clone();
    let permit = match tokio::time::timeout(limits.queue_timeout, permits.acquire_owned()).await {
      Ok(Ok(permit)) => permit,
      _ => {
        log::warn!(
          "Session {} rejected: {} streams already open",
          id,
          limits.max_concurrent
        );
        return with_status(
          Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header(header::RETRY_AFTER, "1")
            .header(header::CONTENT_TYPE, "text/plain"),
          b"Too many streams".to_vec(),
        );
      }
    };

    let stream = match MediaStream::open(id, &media.path, range, Some(permit)).await {
      Ok(stream) => stream,
      Err(e) => {
        log::warn!("Session {} failed to open {:?}: {}", id, media.path, e);
        return plain(StatusCode::NOT_FOUND, "File not found");
      }
    };

    stream_response(id, builder, stream).await
  }
}

/// Body for a prepared response. An abort replaces the whole response with
/// a 500 so no partial media goes out.
async fn stream_response(id: Uuid, builder: Builder, stream: MediaStream) -> Response<Vec<u8>> {
  match drain(stream).await {
    Ok(body) => with_status(builder, body),
    Err(e) => {
      log::error!("Session {} aborted: {}", id, e);
      plain(StatusCode::INTERNAL_SERVER_ERROR, "Stream aborted")
    }
  }
}

/// Pull a bounded stream into one body. Any error discards what was read.
async fn drain(mut stream: MediaStream) -> Result<Vec<u8>, StreamError> {
  let mut body = Vec::with_capacity(stream.expected() as usize);
  while let Some(chunk) = stream.next().await {
    body.extend_from_slice(&chunk?);
  }
  log::trace!("Served {} bytes, {:?}", stream.delivered(), stream.state());
  Ok(body)
}

fn plain(status: StatusCode, message: &str) -> Response<Vec<u8>> {
  with_status(
    Response::builder()
      .status(status)
      .header(header::CONTENT_TYPE, "text/plain"),
    message.as_bytes().to_vec(),
  )
}

fn with_status(builder: Builder, body: Vec<u8>) -> Response<Vec<u8>> {
  builder.body(body).unwrap_or_else(|e| {
    log::error!("Failed to build media response: {}", e);
    let mut response = Response::new(Vec::new());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
  })
}
