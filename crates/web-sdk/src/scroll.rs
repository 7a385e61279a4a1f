//! ScrollCapture reports scroll depth on every scroll notification.
//!
//! There is no throttling: each native scroll tick is gated and dispatched.

use std::rc::{Rc, Weak};

use autocapture_core::error::{CaptureError, CaptureResult};
use autocapture_core::types::CaptureKind;
use tracing::{debug, error};

use crate::context::{CaptureContext, CaptureOutcome};
use crate::events::{DomEvent, EventKind, ScrollMetrics};
use crate::gate::Feature;
use crate::platform::{ListenerId, Platform};

/// Total scrollable height and depth percentage (0–100) for `scroll_top`.
pub fn scroll_depth(platform: &dyn Platform, scroll_top: f64) -> CaptureResult<(f64, u8)> {
    let scroll_height = platform.document_scroll_height().ok_or_else(|| {
        CaptureError::ScrollMetricUnavailable("document scroll height".to_string())
    })?;
    let viewport_height = platform
        .viewport_height()
        .ok_or_else(|| CaptureError::ScrollMetricUnavailable("viewport height".to_string()))?;

    let scrollable = scroll_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 {
        return Err(CaptureError::ScrollMetricUnavailable(format!(
            "no scrollable range (content {scroll_height}, viewport {viewport_height})"
        )));
    }
    let percentage = (scroll_top / scrollable * 100.0).round().clamp(0.0, 100.0) as u8;
    Ok((scroll_height, percentage))
}

/// Measure the current scroll position. Geometry failures degrade the
/// metrics to `scroll_top` only.
pub fn measure(platform: &dyn Platform) -> ScrollMetrics {
    let scroll_top = platform.scroll_y();
    match scroll_depth(platform, scroll_top) {
        Ok((scroll_height, percentage)) => ScrollMetrics {
            scroll_top,
            scroll_height: Some(scroll_height),
            scroll_percentage: Some(percentage),
        },
        Err(e) => {
            error!(error = %e, "error while calculating scroll percentage");
            ScrollMetrics {
                scroll_top,
                scroll_height: None,
                scroll_percentage: None,
            }
        }
    }
}

/// Handle one scroll notification.
pub fn handle_scroll(context: &CaptureContext) -> CaptureOutcome {
    if context.gate.is_current_url_blocked() {
        return CaptureOutcome::Blocked;
    }
    let metrics = measure(context.platform.as_ref());
    context.dispatch(CaptureKind::Scroll, metrics.into_properties())
}

pub struct ScrollCapture {
    context: Rc<CaptureContext>,
    listener: Option<ListenerId>,
}

impl ScrollCapture {
    pub fn new(context: Rc<CaptureContext>) -> Self {
        Self {
            context,
            listener: None,
        }
    }

    /// Remove any listener from a previous arming, then install a new one if
    /// scroll capture is enabled. Returns whether a listener is installed.
    pub fn arm(&mut self) -> bool {
        if let Some(id) = self.listener.take() {
            self.context.platform.remove_listener(id);
        }

        if !self.context.gate.is_enabled(Feature::Scroll) {
            debug!("scroll capture disabled");
            return false;
        }

        let context: Weak<CaptureContext> = Rc::downgrade(&self.context);
        let id = self.context.platform.add_listener(
            EventKind::Scroll,
            Rc::new(move |_: &DomEvent| {
                if let Some(context) = context.upgrade() {
                    handle_scroll(&context);
                }
            }),
        );
        self.listener = Some(id);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.listener.is_some()
    }
}
