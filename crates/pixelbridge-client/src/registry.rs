//! Single-slot "current tracker" registry.
//!
//! Meant for processes that run exactly one tracker: set it once at startup
//! and fetch it from call sites that do not carry the tracker around.
//! Setting a second, differently-configured tracker replaces the first for
//! every later caller; it is not a per-task or per-tenant mechanism.

use std::sync::{Arc, RwLock};

use crate::tracker::ServerTracker;

static CURRENT: RwLock<Option<Arc<ServerTracker>>> = RwLock::new(None);

/// Install `tracker` as the current tracker, returning the previous one.
pub fn set_current(tracker: Arc<ServerTracker>) -> Option<Arc<ServerTracker>> {
    let mut slot = CURRENT.write().unwrap_or_else(|p| p.into_inner());
    slot.replace(tracker)
}

pub fn current() -> Option<Arc<ServerTracker>> {
    CURRENT.read().unwrap_or_else(|p| p.into_inner()).clone()
}

pub fn clear_current() -> Option<Arc<ServerTracker>> {
    CURRENT.write().unwrap_or_else(|p| p.into_inner()).take()
}
