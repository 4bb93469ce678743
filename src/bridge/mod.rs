//! The bridge - the only way the webview reaches the filesystem.
//!
//! Architecture:
//! - `operation.rs` - Closed set of requests/replies (plain data only)
//! - `gateway.rs` - Executes operations against the media scope
//! - `picker.rs` - Native folder dialog behind the `FolderPicker` trait

mod gateway;
mod operation;
mod picker;

pub use gateway::Gateway;
pub use operation::{decode_log_payload, BridgeOperation, BridgeReply, LOG_EVENT};
pub use picker::DialogPicker;
