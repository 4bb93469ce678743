//! Supported video formats.

use std::path::Path;

/// Video formats the player lists and serves.
///
/// This is the only allow-list in the crate: the folder scanner and the
/// `media://` scheme both go through [`VideoFormat::from_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoFormat {
  Mp4,
  M4v,
  Mkv,
  Webm,
  Avi,
  Mov,
}

impl VideoFormat {
  pub const ALL: [VideoFormat; 6] = [
    VideoFormat::Mp4,
    VideoFormat::M4v,
    VideoFormat::Mkv,
    VideoFormat::Webm,
    VideoFormat::Avi,
    VideoFormat::Mov,
  ];

  /// Lowercase file extension without the dot.
  pub fn extension(self) -> &'static str {
    match self {
      VideoFormat::Mp4 => "mp4",
      VideoFormat::M4v => "m4v",
      VideoFormat::Mkv => "mkv",
      VideoFormat::Webm => "webm",
      VideoFormat::Avi => "avi",
      VideoFormat::Mov => "mov",
    }
  }

  /// MIME type sent as `Content-Type` when serving the file.
  pub fn mime_type(self) -> &'static str {
    match self {
      VideoFormat::Mp4 => "video/mp4",
      VideoFormat::M4v => "video/x-m4v",
      VideoFormat::Mkv => "video/x-matroska",
      VideoFormat::Webm => "video/webm",
      VideoFormat::Avi => "video/x-msvideo",
      VideoFormat::Mov => "video/quicktime",
    }
  }

  /// Match an extension case-insensitively.
  pub fn from_extension(ext: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|format| format.extension().eq_ignore_ascii_case(ext))
  }

  /// Format of a path, judged by its extension only (nothing is read).
  pub fn from_path(path: &Path) -> Option<Self> {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(Self::from_extension)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extension_is_case_insensitive() {
    assert_eq!(VideoFormat::from_path(Path::new("/a/Movie.MKV")), Some(VideoFormat::Mkv));
    assert_eq!(VideoFormat::from_path(Path::new("clip.Mp4")), Some(VideoFormat::Mp4));
  }

  #[test]
  fn test_rejects_unknown_and_missing_extensions() {
    assert_eq!(VideoFormat::from_path(Path::new("notes.txt")), None);
    assert_eq!(VideoFormat::from_path(Path::new("README")), None);
    assert_eq!(VideoFormat::from_path(Path::new("archive.mp4.part")), None);
    assert_eq!(VideoFormat::from_path(Path::new(".mp4")), None);
  }

  #[test]
  fn test_content_type_follows_extension() {
    assert_eq!(VideoFormat::Mkv.mime_type(), "video/x-matroska");
    assert_eq!(VideoFormat::Webm.mime_type(), "video/webm");
    for format in VideoFormat::ALL {
      assert_eq!(VideoFormat::from_extension(format.extension()), Some(format));
    }
  }
}
