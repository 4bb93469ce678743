//! Cheap pre-playback check.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Result of probing a candidate file. `exists == false` implies `size == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct StreamProbe {
  pub exists: bool,
  pub size: u64,
}

impl StreamProbe {
  pub const MISSING: StreamProbe = StreamProbe {
    exists: false,
    size: 0,
  };
}

/// Check that `path` is a regular file and report its size. Reads no bytes.
pub async fn probe(path: &Path) -> StreamProbe {
  match tokio::fs::metadata(path).await {
    Ok(meta) if meta.is_file() => StreamProbe {
      exists: true,
      size: meta.len(),
    },
    Ok(_) => StreamProbe::MISSING,
    Err(e) => {
      log::debug!("Probe of {:?} failed: {}", path, e);
      StreamProbe::MISSING
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_existing_file_reports_size() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("clip.mp4");
    std::fs::write(&path, vec![7u8; 4096]).unwrap();

    assert_eq!(
      probe(&path).await,
      StreamProbe {
        exists: true,
        size: 4096
      }
    );
  }

  #[tokio::test]
  async fn test_missing_path_is_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert_eq!(probe(&tmp.path().join("nope.mp4")).await, StreamProbe::MISSING);
  }

  #[tokio::test]
  async fn test_directory_does_not_exist_as_a_stream() {
    let tmp = tempfile::tempdir().unwrap();
    assert_eq!(probe(tmp.path()).await, StreamProbe::MISSING);
  }
}
