//! Main window handling.

use async_channel::Receiver;
use tauri::{AppHandle, Manager, Runtime, WebviewWindow, WebviewWindowBuilder};

use crate::instance::FocusRequest;

/// Label of the window declared in `tauri.conf.json`.
pub const MAIN_WINDOW: &str = "main";

/// Owns access to the main window; handed to whoever needs to show it.
pub struct WindowController<R: Runtime> {
  app: AppHandle<R>,
}

impl<R: Runtime> WindowController<R> {
  pub fn new(app: AppHandle<R>) -> Self {
    Self { app }
  }

  /// Bring the main window to the front, recreating it if it was closed.
  pub fn restore_or_create(&self) -> tauri::Result<()> {
    let window = match self.app.get_webview_window(MAIN_WINDOW) {
      Some(window) => window,
      None => self.create()?,
    };

    if window.is_minimized()? {
      window.unminimize()?;
    }
    window.show()?;
    window.set_focus()
  }

  fn create(&self) -> tauri::Result<WebviewWindow<R>> {
    log::info!("Recreating main window");
    let config = self
      .app
      .config()
      .app
      .windows
      .iter()
      .find(|w| w.label == MAIN_WINDOW)
      .cloned()
      .unwrap_or_default();
    WebviewWindowBuilder::from_config(&self.app, &config)?.build()
  }

  /// Handle focus requests from later launches until the channel closes.
  pub async fn run(self, focus_rx: Receiver<FocusRequest>) {
    while let Ok(FocusRequest) = focus_rx.recv().await {
      if let Err(e) = self.restore_or_create() {
        log::error!("Failed to restore main window: {}", e);
      }
    }
  }
}
