//! Bridge request/reply types.

use serde::{Deserialize, Serialize};
use specta::Type;

use crate::media::{StreamProbe, VideoFileRecord};

/// Fire-and-forget event the webview emits to write into the app log.
pub const LOG_EVENT: &str = "bridge:log";

/// Every request the webview can make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeOperation {
  /// Open the native folder picker.
  SelectFolder,
  /// List the videos of a folder.
  ListVideos { path: String },
  /// Check that a file exists and get its size.
  ProbeStream { path: String },
}

impl BridgeOperation {
  pub fn name(&self) -> &'static str {
    match self {
      BridgeOperation::SelectFolder => "selectFolder",
      BridgeOperation::ListVideos { .. } => "listVideos",
      BridgeOperation::ProbeStream { .. } => "probeStream",
    }
  }
}

/// Why a folder could not be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub enum ListError {
  /// Missing, not a directory, or no permission.
  Unreadable,
  /// Not a folder the user picked.
  NotGranted,
}

/// Result of `ListVideos`. `ok == false` always comes with an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct VideoListing {
  pub ok: bool,
  pub videos: Vec<VideoFileRecord>,
  pub error: Option<ListError>,
}

impl VideoListing {
  pub fn found(videos: Vec<VideoFileRecord>) -> Self {
    Self {
      ok: true,
      videos,
      error: None,
    }
  }

  pub fn failed(error: ListError) -> Self {
    Self {
      ok: false,
      videos: Vec::new(),
      error: Some(error),
    }
  }
}

/// Reply to a [`BridgeOperation`], tagged with the same `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeReply {
  /// `path` is `None` when the user cancelled the dialog.
  SelectFolder { path: Option<String> },
  ListVideos(VideoListing),
  ProbeStream(StreamProbe),
}

/// Turn a `bridge:log` event payload into the message to log.
///
/// The webview sends JSON; a JSON string is unwrapped, anything else is
/// logged as received.
pub fn decode_log_payload(payload: &str) -> String {
  match serde_json::from_str::<String>(payload) {
    Ok(message) => message,
    Err(_) => payload.to_string(),
  }
}
