//! Executes bridge operations.

use std::path::Path;
use std::sync::Arc;

use super::operation::{BridgeOperation, BridgeReply, ListError, VideoListing};
use super::picker::FolderPicker;
use crate::media::{self, StreamProbe};
use crate::scope::MediaScope;

/// Privileged side of the bridge.
///
/// Operations are independent; the only state they share is the
/// [`MediaScope`], which `SelectFolder` extends.
pub struct Gateway<P: FolderPicker> {
  picker: P,
  scope: Arc<MediaScope>,
  restrict_to_selection: bool,
}

impl<P: FolderPicker> Gateway<P> {
  pub fn new(picker: P, scope: Arc<MediaScope>, restrict_to_selection: bool) -> Self {
    Self {
      picker,
      scope,
      restrict_to_selection,
    }
  }

  pub async fn handle(&self, operation: BridgeOperation) -> BridgeReply {
    log::debug!("Bridge call: {}", operation.name());
    match operation {
      BridgeOperation::SelectFolder => BridgeReply::SelectFolder {
        path: self.select_folder().await,
      },
      BridgeOperation::ListVideos { path } => BridgeReply::ListVideos(self.list_videos(&path).await),
      BridgeOperation::ProbeStream { path } => BridgeReply::ProbeStream(self.probe_stream(&path).await),
    }
  }

  async fn select_folder(&self) -> Option<String> {
    let picked = self.picker.pick_folder().await?;
    match self.scope.grant(&picked).await {
      Ok(canonical) => canonical.to_str().map(str::to_owned),
      Err(e) => {
        log::warn!("Cannot use picked folder {:?}: {}", picked, e);
        None
      }
    }
  }

  async fn list_videos(&self, path: &str) -> VideoListing {
    let dir = Path::new(path);
    if self.restrict_to_selection {
      let Ok(canonical) = tokio::fs::canonicalize(dir).await else {
        return VideoListing::failed(ListError::Unreadable);
      };
      if !self.scope.is_granted(&canonical) {
        log::warn!("Refusing to list {:?}: not a picked folder", canonical);
        return VideoListing::failed(ListError::NotGranted);
      }
    }

    match media::list_videos(dir).await {
      Ok(videos) => VideoListing::found(videos),
      Err(e) => {
        log::warn!("{}", e);
        VideoListing::failed(ListError::Unreadable)
      }
    }
  }

  async fn probe_stream(&self, path: &str) -> StreamProbe {
    let path = Path::new(path);
    if self.restrict_to_selection {
      let Ok(canonical) = tokio::fs::canonicalize(path).await else {
        return StreamProbe::MISSING;
      };
      if !self.scope.contains(&canonical) {
        log::warn!("Refusing to probe {:?}: outside picked folders", canonical);
        return StreamProbe::MISSING;
      }
      return media::probe(&canonical).await;
    }
    media::probe(path).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;
  use std::future::Future;
  use std::path::PathBuf;

  /// Picker that answers from a queue instead of showing a dialog.
  struct ScriptedPicker(Mutex<Vec<Option<PathBuf>>>);

  impl FolderPicker for ScriptedPicker {
    fn pick_folder(&self) -> impl Future<Output = Option<PathBuf>> + Send {
      let answer = self.0.lock().pop().flatten();
      async move { answer }
    }
  }

  fn gateway(answers: Vec<Option<PathBuf>>, restrict: bool) -> Gateway<ScriptedPicker> {
    Gateway::new(
      ScriptedPicker(Mutex::new(answers)),
      Arc::new(MediaScope::new()),
      restrict,
    )
  }

  fn video_folder() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("one.mp4"), vec![0u8; 10]).unwrap();
    std::fs::write(tmp.path().join("two.mkv"), vec![0u8; 20]).unwrap();
    std::fs::write(tmp.path().join("cover.png"), vec![0u8; 5]).unwrap();
    tmp
  }

  async fn list(gateway: &Gateway<ScriptedPicker>, path: &Path) -> VideoListing {
    let op = BridgeOperation::ListVideos {
      path: path.to_str().unwrap().to_string(),
    };
    match gateway.handle(op).await {
      BridgeReply::ListVideos(listing) => listing,
      other => panic!("Expected listing, got {:?}", other),
    }
  }

  async fn probe(gateway: &Gateway<ScriptedPicker>, path: &Path) -> StreamProbe {
    let op = BridgeOperation::ProbeStream {
      path: path.to_str().unwrap().to_string(),
    };
    match gateway.handle(op).await {
      BridgeReply::ProbeStream(probe) => probe,
      other => panic!("Expected probe, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_select_then_list() {
    let folder = video_folder();
    let gateway = gateway(vec![Some(folder.path().to_path_buf())], true);

    let reply = gateway.handle(BridgeOperation::SelectFolder).await;
    let BridgeReply::SelectFolder { path: Some(selected) } = &reply else {
      panic!("Expected a selection, got {:?}", reply);
    };

    let listing = list(&gateway, Path::new(selected)).await;
    assert!(listing.ok);
    assert_eq!(listing.error, None);
    let names: Vec<_> = listing.videos.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["one.mp4", "two.mkv"]);
  }

  #[tokio::test]
  async fn test_cancelled_selection() {
    let gateway = gateway(vec![None], true);
    assert_eq!(
      gateway.handle(BridgeOperation::SelectFolder).await,
      BridgeReply::SelectFolder { path: None }
    );
  }

  #[tokio::test]
  async fn test_listing_requires_a_picked_folder() {
    let folder = video_folder();
    let gateway = gateway(vec![], true);

    let listing = list(&gateway, folder.path()).await;
    assert_eq!(listing, VideoListing::failed(ListError::NotGranted));
  }

  #[tokio::test]
  async fn test_unrestricted_listing_distinguishes_empty_from_unreadable() {
    let folder = tempfile::tempdir().unwrap();
    let gateway = gateway(vec![], false);

    let empty = list(&gateway, folder.path()).await;
    assert!(empty.ok);
    assert!(empty.videos.is_empty());

    let missing = list(&gateway, &folder.path().join("missing")).await;
    assert_eq!(missing, VideoListing::failed(ListError::Unreadable));
  }

  #[tokio::test]
  async fn test_granted_but_vanished_folder_is_unreadable() {
    let parent = tempfile::tempdir().unwrap();
    let folder = parent.path().join("shows");
    std::fs::create_dir(&folder).unwrap();
    let gateway = gateway(vec![Some(folder.clone())], true);
    gateway.handle(BridgeOperation::SelectFolder).await;
    std::fs::remove_dir(&folder).unwrap();

    let listing = list(&gateway, &folder).await;
    assert_eq!(listing, VideoListing::failed(ListError::Unreadable));
  }

  #[tokio::test]
  async fn test_probe_inside_and_outside_scope() {
    let folder = video_folder();
    let other = video_folder();
    let gateway = gateway(vec![Some(folder.path().to_path_buf())], true);
    gateway.handle(BridgeOperation::SelectFolder).await;

    assert_eq!(
      probe(&gateway, &folder.path().join("two.mkv")).await,
      StreamProbe {
        exists: true,
        size: 20
      }
    );
    assert_eq!(probe(&gateway, &folder.path().join("nope.mp4")).await, StreamProbe::MISSING);
    assert_eq!(probe(&gateway, &other.path().join("one.mp4")).await, StreamProbe::MISSING);
  }
}
