//! Folder scanner - lists the playable videos of one directory.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::format::VideoFormat;

#[derive(Error, Debug)]
pub enum ScanError {
  #[error("Cannot read directory {path:?}: {source}")]
  DirectoryUnreadable {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A playable file found in a scanned folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct VideoFileRecord {
  /// Final path segment, e.g. `holiday.mp4`.
  pub name: String,
  /// Canonical folder joined with `name`.
  pub path: String,
}

/// List the videos directly inside `dir` (no recursion), sorted by name.
///
/// Directories are never listed, even when their name looks like a video.
/// Symlinks count when they point at a regular file.
pub async fn list_videos(dir: &Path) -> Result<Vec<VideoFileRecord>, ScanError> {
  let unreadable = |source| ScanError::DirectoryUnreadable {
    path: dir.to_path_buf(),
    source,
  };

  let root = tokio::fs::canonicalize(dir).await.map_err(unreadable)?;
  let mut entries = tokio::fs::read_dir(&root).await.map_err(unreadable)?;
  let mut records = Vec::new();

  while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
    let file_name = entry.file_name();
    let Some(name) = file_name.to_str() else {
      log::debug!("Skipping non UTF-8 entry {:?}", file_name);
      continue;
    };

    let path = root.join(name);
    if VideoFormat::from_path(&path).is_none() {
      continue;
    }

    // metadata() follows symlinks, file_type() would not
    match tokio::fs::metadata(&path).await {
      Ok(meta) if meta.is_file() => {}
      Ok(_) => continue,
      Err(e) => {
        log::debug!("Skipping {:?}: {}", path, e);
        continue;
      }
    }

    let Some(path) = path.to_str().map(str::to_owned) else {
      continue;
    };
    records.push(VideoFileRecord {
      name: name.to_owned(),
      path,
    });
  }

  records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
  log::info!("Found {} videos in {:?}", records.len(), root);
  Ok(records)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"x").unwrap();
  }

  #[tokio::test]
  async fn test_lists_only_matching_files() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["b.mp4", "A.MKV", "c.webm"] {
      touch(tmp.path(), name);
    }
    for name in ["notes.txt", "cover.jpg", "noext", "movie.mp4.part"] {
      touch(tmp.path(), name);
    }
    fs::create_dir(tmp.path().join("folder.mp4")).unwrap();

    let records = list_videos(tmp.path()).await.unwrap();
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A.MKV", "b.mp4", "c.webm"]);

    let canonical = fs::canonicalize(tmp.path()).unwrap();
    for record in &records {
      assert_eq!(Path::new(&record.path), canonical.join(&record.name));
      assert!(Path::new(&record.path).is_file());
    }
  }

  #[tokio::test]
  async fn test_order_is_stable_across_calls() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["zeta.mp4", "alpha.mov", "Mid.avi", "beta.m4v"] {
      touch(tmp.path(), name);
    }
    let first = list_videos(tmp.path()).await.unwrap();
    let second = list_videos(tmp.path()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
  }

  #[tokio::test]
  async fn test_empty_folder_is_ok() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "readme.md");
    assert!(list_videos(tmp.path()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_missing_folder_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let result = list_videos(&tmp.path().join("gone")).await;
    assert!(matches!(result, Err(ScanError::DirectoryUnreadable { .. })));
  }

  #[tokio::test]
  async fn test_file_instead_of_folder_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "clip.mp4");
    let result = list_videos(&tmp.path().join("clip.mp4")).await;
    assert!(matches!(result, Err(ScanError::DirectoryUnreadable { .. })));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_follows_symlinked_files() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "real.bin");
    std::os::unix::fs::symlink(tmp.path().join("real.bin"), tmp.path().join("link.mp4")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("missing"), tmp.path().join("dangling.mp4"))
      .unwrap();

    let records = list_videos(tmp.path()).await.unwrap();
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["link.mp4"]);
  }
}
