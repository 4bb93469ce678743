//! The `media://` URI scheme - serves local video files to the webview.
//!
//! Architecture:
//! - `reference.rs` - Media reference -> validated file inside the allowed roots
//! - `range.rs` - HTTP `Range` header handling
//! - `session.rs` - Per-request stream session (pull-based, releases its handle on every exit)
//! - `handler.rs` - Request -> response, concurrency limit

mod handler;
mod range;
mod reference;
mod session;

pub use handler::{MediaSchemeHandler, StreamLimits, MEDIA_SCHEME};
