//! Interception of the host-owned history entry points.
//!
//! The installed wrapper forwards the call untouched to the entry point it
//! replaced and hands back that entry point's result. The notification fires
//! only after the original returned `Ok`; an erroring original behaves like
//! a native throw and leaves navigation state unchanged.

use std::rc::Rc;

use tracing::debug;

use crate::platform::{HistoryCall, HistoryHandler, HistoryMethod, Platform};

/// Wrap `method` on `platform` so that `on_change` runs after every
/// successful call. Returns `false` when the platform has no such entry point.
pub fn intercept(platform: &dyn Platform, method: HistoryMethod, on_change: Rc<dyn Fn()>) -> bool {
    let Some(original) = platform.history_entry_point(method) else {
        debug!(?method, "history entry point missing, not wrapped");
        return false;
    };

    let wrapped: HistoryHandler = Rc::new(move |call: &HistoryCall| {
        let result = original(call);
        if result.is_ok() {
            on_change();
        }
        result
    });
    platform.set_history_entry_point(method, wrapped);
    true
}
