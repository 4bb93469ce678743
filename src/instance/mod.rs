//! Single-instance guard.
//!
//! The first process claims a per-user local endpoint (Unix socket or named
//! pipe). Later launches find it taken, ask the running process to show its
//! window, and quit before doing anything else.

mod guard;

pub use guard::{Acquire, Endpoint, FocusRequest, InstanceGuard};
