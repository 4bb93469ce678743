//! Local media access: the format allow-list, folder scanning and probing.
//!
//! Architecture:
//! - `format.rs` - The closed set of video formats (listing and serving share it)
//! - `scanner.rs` - Non-recursive folder listing
//! - `probe.rs` - Metadata-only existence/size check

mod format;
mod probe;
mod scanner;

pub use format::VideoFormat;
pub use probe::{probe, StreamProbe};
pub use scanner::{list_videos, VideoFileRecord};
