//! State shared by the capture subsystems. Handlers are plain functions over
//! a [`CaptureContext`]; listeners hold it weakly so they go inert once the
//! owning [`crate::Autocapture`] is dropped.

use std::rc::Rc;

use autocapture_core::config::ConfigProvider;
use autocapture_core::dispatch::Dispatcher;
use autocapture_core::error::CaptureError;
use autocapture_core::types::{with_default_properties, CaptureKind, Properties};
use tracing::debug;

use crate::gate::ConfigGate;
use crate::platform::Platform;

pub struct CaptureContext {
    pub platform: Rc<dyn Platform>,
    pub gate: ConfigGate,
    pub dispatcher: Rc<dyn Dispatcher>,
}

impl CaptureContext {
    pub fn new(
        platform: Rc<dyn Platform>,
        config: Rc<dyn ConfigProvider>,
        dispatcher: Rc<dyn Dispatcher>,
    ) -> Self {
        Self {
            gate: ConfigGate::new(config, platform.clone()),
            platform,
            dispatcher,
        }
    }

    /// Merge the default properties into `properties` and hand the event to
    /// the host. Page views go through the dedicated page-view call.
    pub fn dispatch(&self, kind: CaptureKind, properties: Properties) -> CaptureOutcome {
        let properties = with_default_properties(properties);
        let accepted = match kind {
            CaptureKind::PageView => self.dispatcher.track_pageview(properties),
            CaptureKind::Click | CaptureKind::Scroll => {
                self.dispatcher.track(kind.event_name(), properties)
            }
        };
        if accepted {
            debug!(event = kind.event_name(), "event dispatched");
            CaptureOutcome::Dispatched
        } else {
            let err = CaptureError::DispatchFailure {
                event: kind.event_name().to_string(),
            };
            debug!(error = %err, "host rejected event");
            CaptureOutcome::DispatchFailed
        }
    }
}

/// What a capture handler did with one browser event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The current URL is blocked.
    Blocked,
    /// Nothing worth reporting (ignored click target, unchanged URL, feature off).
    Skipped,
    Dispatched,
    DispatchFailed,
}
