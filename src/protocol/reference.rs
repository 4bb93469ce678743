//! Media reference resolution.
//!
//! A reference is the path part of `media://localhost/<percent-encoded path>`
//! (`http://media.localhost/...` on Windows), which is what the webview's
//! `convertFileSrc(path, "media")` produces. It is resolved again on every
//! request; nothing is cached.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::media::VideoFormat;
use crate::scope::MediaScope;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
  #[error("Invalid media reference: {0}")]
  InvalidReference(String),
  #[error("Unsupported format: {0:?}")]
  UnsupportedFormat(PathBuf),
  #[error("No such file: {0:?}")]
  NotFound(PathBuf),
  #[error("Outside of allowed folders: {0:?}")]
  OutsideRoots(PathBuf),
}

/// A file that passed validation and may be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
  pub path: PathBuf,
  pub format: VideoFormat,
  pub size: u64,
}

/// Resolve a reference to a regular file inside the allowed roots.
///
/// The extension is checked first, before the filesystem is touched.
pub async fn resolve(reference: &str, scope: &MediaScope) -> Result<ResolvedMedia, ResolveError> {
  let encoded = reference.trim_start_matches('/');
  if encoded.is_empty() {
    return Err(ResolveError::InvalidReference(reference.to_string()));
  }
  let decoded = percent_decode_str(encoded)
    .decode_utf8()
    .map_err(|_| ResolveError::InvalidReference(reference.to_string()))?;

  let candidate = PathBuf::from(decoded.into_owned());
  let format = VideoFormat::from_path(&candidate)
    .ok_or_else(|| ResolveError::UnsupportedFormat(candidate.clone()))?;

  let candidate = if candidate.is_absolute() {
    candidate
  } else {
    match scope.install_root() {
      Some(root) => root.join(candidate),
      None => return Err(ResolveError::NotFound(candidate)),
    }
  };

  let canonical = tokio::fs::canonicalize(&candidate)
    .await
    .map_err(|_| ResolveError::NotFound(candidate.clone()))?;
  if !scope.contains(&canonical) {
    return Err(ResolveError::OutsideRoots(canonical));
  }

  let size = regular_file_size(&canonical)
    .await
    .ok_or_else(|| ResolveError::NotFound(canonical.clone()))?;

  Ok(ResolvedMedia {
    path: canonical,
    format,
    size,
  })
}

async fn regular_file_size(path: &Path) -> Option<u64> {
  match tokio::fs::metadata(path).await {
    Ok(meta) if meta.is_file() => Some(meta.len()),
    _ => None,
  }
}
