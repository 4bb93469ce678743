//! Directories the UI is allowed to see.
//!
//! Two kinds of roots: the installation media root (set once at startup) and
//! the folders the user picked through the native dialog. All stored paths are
//! canonical, so a canonical candidate can be checked with `starts_with`.

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MediaScope {
  install_root: RwLock<Option<PathBuf>>,
  granted: RwLock<Vec<PathBuf>>,
}

impl MediaScope {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the installation media root. Relative media references resolve here.
  pub fn set_install_root(&self, root: PathBuf) {
    let root = std::fs::canonicalize(&root).unwrap_or(root);
    log::info!("Media root: {:?}", root);
    *self.install_root.write() = Some(root);
  }

  pub fn install_root(&self) -> Option<PathBuf> {
    self.install_root.read().clone()
  }

  /// Record a folder chosen by the user. Returns its canonical form.
  pub async fn grant(&self, dir: &Path) -> io::Result<PathBuf> {
    let canonical = tokio::fs::canonicalize(dir).await?;
    let mut granted = self.granted.write();
    if !granted.contains(&canonical) {
      log::info!("Granted folder {:?}", canonical);
      granted.push(canonical.clone());
    }
    Ok(canonical)
  }

  /// True if `canonical` is a picked folder or lies below one.
  pub fn is_granted(&self, canonical: &Path) -> bool {
    self
      .granted
      .read()
      .iter()
      .any(|root| canonical.starts_with(root))
  }

  /// True if `canonical` lies below the media root or a picked folder.
  pub fn contains(&self, canonical: &Path) -> bool {
    let in_install_root = self
      .install_root
      .read()
      .as_ref()
      .is_some_and(|root| canonical.starts_with(root));
    in_install_root || self.is_granted(canonical)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_grant_covers_folder_and_children_only() {
    let tmp = tempfile::tempdir().unwrap();
    let picked = tmp.path().join("picked");
    std::fs::create_dir_all(picked.join("season1")).unwrap();
    std::fs::create_dir(tmp.path().join("other")).unwrap();

    let scope = MediaScope::new();
    let canonical = scope.grant(&picked).await.unwrap();

    assert!(scope.is_granted(&canonical));
    assert!(scope.is_granted(&canonical.join("season1")));
    assert!(!scope.is_granted(&std::fs::canonicalize(tmp.path().join("other")).unwrap()));
    assert!(!scope.is_granted(&std::fs::canonicalize(tmp.path()).unwrap()));
  }

  #[tokio::test]
  async fn test_grant_is_idempotent_and_rejects_missing_folders() {
    let tmp = tempfile::tempdir().unwrap();
    let scope = MediaScope::new();
    scope.grant(tmp.path()).await.unwrap();
    scope.grant(tmp.path()).await.unwrap();
    assert_eq!(scope.granted.read().len(), 1);
    assert!(scope.grant(&tmp.path().join("missing")).await.is_err());
  }

  #[test]
  fn test_install_root_is_contained() {
    let tmp = tempfile::tempdir().unwrap();
    let scope = MediaScope::new();
    assert!(!scope.contains(tmp.path()));

    scope.set_install_root(tmp.path().to_path_buf());
    let root = scope.install_root().unwrap();
    assert!(scope.contains(&root.join("intro.mp4")));
    assert!(!scope.is_granted(&root.join("intro.mp4")));
  }
}
