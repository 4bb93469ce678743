//! Native folder selection.

use std::future::Future;
use std::path::PathBuf;

use tauri::{AppHandle, Runtime};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

/// Source of user-chosen folders.
pub trait FolderPicker: Send + Sync + 'static {
  /// Ask the user for a folder. `None` means the dialog was cancelled.
  fn pick_folder(&self) -> impl Future<Output = Option<PathBuf>> + Send;
}

/// Folder picker backed by the OS dialog.
pub struct DialogPicker<R: Runtime> {
  app: AppHandle<R>,
}

impl<R: Runtime> DialogPicker<R> {
  pub fn new(app: AppHandle<R>) -> Self {
    Self { app }
  }
}

impl<R: Runtime> FolderPicker for DialogPicker<R> {
  fn pick_folder(&self) -> impl Future<Output = Option<PathBuf>> + Send {
    let (tx, rx) = oneshot::channel();

    let mut dialog = self.app.dialog().file().set_title("Choose a video folder");
    if let Some(videos) = dirs::video_dir() {
      dialog = dialog.set_directory(videos);
    }
    dialog.pick_folder(move |folder| {
      let _ = tx.send(folder);
    });

    async move {
      let folder = rx.await.ok().flatten()?;
      match folder.into_path() {
        Ok(path) => Some(path),
        Err(e) => {
          log::warn!("Picked folder is not a local path: {}", e);
          None
        }
      }
    }
  }
}
