//! NavigationWatcher: SPA page-view detection.
//!
//! Three signal sources (`popstate`, `hashchange`, and the wrapped history
//! entry points) publish into one [`LocationChannel`] owned by the watcher.
//! Its single subscriber compares the current URL with the dedup baseline at
//! the configured granularity and reports a page view when they differ. The
//! baseline only moves after the host accepted the page view, so a rejected
//! page view is retried on the next notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use autocapture_core::config::PageviewMode;
use autocapture_core::types::{CaptureKind, Properties};
use tracing::{debug, info, trace};

use crate::context::{CaptureContext, CaptureOutcome};
use crate::events::{DomEvent, EventKind};
use crate::gate::Feature;
use crate::history;
use crate::platform::HistoryMethod;

/// Dedup baseline: the last URL whose page view the host accepted. Empty
/// until the first accepted page view, so the next navigation always counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub previous_tracked_url: String,
}

/// The part of `url` that matters under `mode`, or `None` when page views
/// are disabled.
pub fn significant_url(mode: PageviewMode, url: &str) -> Option<&str> {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    match mode {
        PageviewMode::Disabled => None,
        PageviewMode::FullUrl => Some(url),
        PageviewMode::UrlWithPathAndQueryString => Some(without_fragment),
        PageviewMode::UrlWithPath => Some(
            without_fragment
                .split_once('?')
                .map_or(without_fragment, |(head, _)| head),
        ),
    }
}

/// Whether moving from `previous` to `current` is a new page view under `mode`.
pub fn location_changed(mode: PageviewMode, previous: &str, current: &str) -> bool {
    match (significant_url(mode, previous), significant_url(mode, current)) {
        (Some(previous), Some(current)) => previous != current,
        _ => false,
    }
}

/// Handle one "location changed" notification.
pub fn handle_location_change(
    context: &CaptureContext,
    state: &RefCell<NavigationState>,
) -> CaptureOutcome {
    let current = context.platform.current_url();
    let mode = context.gate.pageview_mode();
    if !location_changed(mode, &state.borrow().previous_tracked_url, &current) {
        trace!(url = %current, ?mode, "location unchanged");
        return CaptureOutcome::Skipped;
    }

    // No borrow is held across the dispatch: the host may navigate from
    // inside its page-view call.
    let outcome = context.dispatch(CaptureKind::PageView, Properties::new());
    if outcome == CaptureOutcome::Dispatched {
        state.borrow_mut().previous_tracked_url = current;
    }
    outcome
}

/// Internal "location changed" channel with a single consumer.
#[derive(Default)]
pub struct LocationChannel {
    subscriber: RefCell<Option<Rc<dyn Fn()>>>,
}

impl LocationChannel {
    fn subscribe(&self, handler: Rc<dyn Fn()>) {
        *self.subscriber.borrow_mut() = Some(handler);
    }

    pub fn publish(&self) {
        let handler = self.subscriber.borrow().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

/// An armed navigation watcher. There is no disarm: the installed
/// listeners and history wrappers stay in place for the page's lifetime.
pub struct NavigationWatcher {
    state: Rc<RefCell<NavigationState>>,
    channel: Rc<LocationChannel>,
}

impl NavigationWatcher {
    /// Report the initial page view, then install the signal sources.
    /// Returns `None` when page-view tracking is disabled.
    pub fn arm(context: &Rc<CaptureContext>) -> Option<Self> {
        if !context.gate.is_enabled(Feature::Pageview) {
            debug!("pageview tracking disabled");
            return None;
        }

        let state = Rc::new(RefCell::new(NavigationState::default()));
        if context.dispatch(CaptureKind::PageView, Properties::new()) == CaptureOutcome::Dispatched
        {
            state.borrow_mut().previous_tracked_url = context.platform.current_url();
        }

        let channel = Rc::new(LocationChannel::default());
        let weak_context: Weak<CaptureContext> = Rc::downgrade(context);
        let handler_state = state.clone();
        channel.subscribe(Rc::new(move || {
            if let Some(context) = weak_context.upgrade() {
                handle_location_change(&context, &handler_state);
            }
        }));

        let platform = context.platform.as_ref();
        for kind in [EventKind::PopState, EventKind::HashChange] {
            let channel = channel.clone();
            platform.add_listener(kind, Rc::new(move |_: &DomEvent| channel.publish()));
        }
        let mut wrapped = Vec::new();
        for method in HistoryMethod::ALL {
            let channel = channel.clone();
            if history::intercept(platform, method, Rc::new(move || channel.publish())) {
                wrapped.push(method);
            }
        }

        info!(
            baseline = %state.borrow().previous_tracked_url,
            ?wrapped,
            "navigation watcher armed"
        );
        Some(Self { state, channel })
    }

    pub fn previous_tracked_url(&self) -> String {
        self.state.borrow().previous_tracked_url.clone()
    }

    /// Raise a "location changed" notification by hand.
    pub fn notify(&self) {
        self.channel.publish();
    }
}
