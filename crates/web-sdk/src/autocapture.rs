//! Autocapture lifecycle: capability check, then independent arming of the
//! navigation watcher, click capture and scroll capture.

use std::rc::Rc;

use autocapture_core::config::ConfigProvider;
use autocapture_core::dispatch::Dispatcher;
use autocapture_core::error::CaptureError;
use tracing::{error, info, warn};

use crate::click::{ClickCapture, TargetResolver};
use crate::context::CaptureContext;
use crate::navigation::NavigationWatcher;
use crate::platform::Platform;
use crate::resolver::ElementTargetResolver;
use crate::scroll::ScrollCapture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Armed,
    /// Required platform APIs were missing; nothing is installed and later
    /// `init` calls do nothing.
    Unavailable,
}

/// Automatic event capture bound to one host SDK instance.
///
/// Installed listeners hold the shared context weakly: keep this value alive
/// for as long as capture should run.
pub struct Autocapture {
    context: Rc<CaptureContext>,
    click: ClickCapture,
    scroll: ScrollCapture,
    navigation: Vec<NavigationWatcher>,
    state: LifecycleState,
}

impl Autocapture {
    pub fn new(
        platform: Rc<dyn Platform>,
        config: Rc<dyn ConfigProvider>,
        dispatcher: Rc<dyn Dispatcher>,
    ) -> Self {
        let context = Rc::new(CaptureContext::new(platform, config, dispatcher));
        Self {
            click: ClickCapture::new(context.clone(), Rc::new(ElementTargetResolver)),
            scroll: ScrollCapture::new(context.clone()),
            context,
            navigation: Vec::new(),
            state: LifecycleState::Uninitialized,
        }
    }

    /// Replace the click target resolver. Takes effect on the next `init`.
    pub fn with_target_resolver(mut self, resolver: Rc<dyn TargetResolver>) -> Self {
        self.click.set_resolver(resolver);
        self
    }

    /// Arm every subsystem the current configuration enables.
    ///
    /// Calling this again re-arms click and scroll capture in place. The
    /// navigation watcher is armed again as well, without removing the
    /// previous one's listeners and history wrappers, so navigation after a
    /// second `init` is reported once per arming.
    pub fn init(&mut self) {
        if self.state == LifecycleState::Unavailable {
            return;
        }

        let capabilities = self.context.platform.capabilities();
        if !capabilities.is_complete() {
            let err = CaptureError::CapabilityMissing(capabilities.missing().join(", "));
            error!(error = %err, "autocapture disabled");
            self.state = LifecycleState::Unavailable;
            return;
        }

        if !self.navigation.is_empty() {
            warn!(
                armed = self.navigation.len(),
                "navigation watcher armed again; previous listeners and history wrappers stay installed"
            );
        }
        if let Some(watcher) = NavigationWatcher::arm(&self.context) {
            self.navigation.push(watcher);
        }
        let click = self.click.arm();
        let scroll = self.scroll.arm();

        self.state = LifecycleState::Armed;
        info!(
            pageview = !self.navigation.is_empty(),
            click,
            scroll,
            "autocapture initialized"
        );
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_click_armed(&self) -> bool {
        self.click.is_armed()
    }

    pub fn is_scroll_armed(&self) -> bool {
        self.scroll.is_armed()
    }

    /// Number of navigation watchers installed so far.
    pub fn navigation_watchers(&self) -> usize {
        self.navigation.len()
    }

    /// Dedup baseline of the most recently armed navigation watcher.
    pub fn previous_tracked_url(&self) -> Option<String> {
        self.navigation
            .last()
            .map(NavigationWatcher::previous_tracked_url)
    }

    /// Whether capture is currently blocked on the page shown.
    pub fn is_current_url_blocked(&self) -> bool {
        self.context.gate.is_current_url_blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ClickEvent, ElementDescriptor, EventKind};
    use crate::platform::Capabilities;
    use crate::sim::SimulatedBrowser;
    use autocapture_core::config::StaticConfig;
    use autocapture_core::dispatch::recording_dispatcher;
    use autocapture_core::types::CaptureKind;
    use serde_json::json;

    fn all_enabled() -> Rc<StaticConfig> {
        Rc::new(StaticConfig::from_json(json!({
            "autocapture": { "click": true, "scroll": true, "pageview": "full-url" }
        })))
    }

    #[test]
    fn test_missing_capabilities_leave_module_disarmed() {
        let browser = SimulatedBrowser::new("https://a.com/").unwrap();
        browser.set_capabilities(Capabilities {
            history: false,
            ..Capabilities::FULL
        });
        let dispatcher = recording_dispatcher();
        let mut autocapture = Autocapture::new(browser.clone(), all_enabled(), dispatcher.clone());

        autocapture.init();
        assert_eq!(autocapture.state(), LifecycleState::Unavailable);

        browser.set_capabilities(Capabilities::FULL);
        autocapture.init();
        assert_eq!(autocapture.state(), LifecycleState::Unavailable);
        assert_eq!(dispatcher.attempts(), 0);
        for kind in [EventKind::Click, EventKind::Scroll, EventKind::PopState] {
            assert_eq!(browser.listener_count(kind), 0);
        }
    }

    #[test]
    fn test_init_arms_enabled_subsystems() {
        let browser = SimulatedBrowser::new("https://a.com/").unwrap();
        let dispatcher = recording_dispatcher();
        let mut autocapture = Autocapture::new(browser.clone(), all_enabled(), dispatcher.clone());
        autocapture.init();

        assert_eq!(autocapture.state(), LifecycleState::Armed);
        assert!(autocapture.is_click_armed());
        assert!(autocapture.is_scroll_armed());
        assert_eq!(autocapture.navigation_watchers(), 1);
        assert_eq!(autocapture.previous_tracked_url().as_deref(), Some("https://a.com/"));

        browser.click(ClickEvent::on(ElementDescriptor {
            tag_name: "a".into(),
            ..Default::default()
        }));
        browser.scroll_to(10.0);
        assert_eq!(dispatcher.count_kind(CaptureKind::PageView), 1);
        assert_eq!(dispatcher.count_kind(CaptureKind::Click), 1);
        assert_eq!(dispatcher.count_kind(CaptureKind::Scroll), 1);
    }

    #[test]
    fn test_each_feature_is_gated_independently() {
        let browser = SimulatedBrowser::new("https://a.com/").unwrap();
        let config = Rc::new(StaticConfig::from_json(json!({ "autocapture": { "scroll": true } })));
        let mut autocapture = Autocapture::new(browser.clone(), config, recording_dispatcher());
        autocapture.init();

        assert!(!autocapture.is_click_armed());
        assert!(autocapture.is_scroll_armed());
        assert_eq!(autocapture.navigation_watchers(), 0);
        assert_eq!(autocapture.previous_tracked_url(), None);
    }

    #[test]
    fn test_second_init_duplicates_navigation_only() {
        let browser = SimulatedBrowser::new("https://a.com/a").unwrap();
        let dispatcher = recording_dispatcher();
        let mut autocapture = Autocapture::new(browser.clone(), all_enabled(), dispatcher.clone());
        autocapture.init();
        autocapture.init();

        assert_eq!(browser.listener_count(EventKind::Click), 1);
        assert_eq!(browser.listener_count(EventKind::Scroll), 1);
        assert_eq!(browser.listener_count(EventKind::PopState), 2);
        assert_eq!(autocapture.navigation_watchers(), 2);

        dispatcher.clear();
        browser.push_state("/b").unwrap();
        assert_eq!(dispatcher.count_kind(CaptureKind::PageView), 2);
    }

    #[test]
    fn test_resolver_swap_after_init_keeps_single_click_listener() {
        let browser = SimulatedBrowser::new("https://a.com/a").unwrap();
        let dispatcher = recording_dispatcher();
        let config = Rc::new(StaticConfig::from_json(json!({ "autocapture": { "click": true } })));
        let mut autocapture = Autocapture::new(browser.clone(), config, dispatcher.clone());
        autocapture.init();

        let mut autocapture = autocapture.with_target_resolver(Rc::new(ElementTargetResolver));
        autocapture.init();
        assert_eq!(browser.listener_count(EventKind::Click), 1);

        browser.click(ClickEvent::on(ElementDescriptor {
            tag_name: "a".into(),
            ..Default::default()
        }));
        assert_eq!(dispatcher.count_kind(CaptureKind::Click), 1);
    }

    #[test]
    fn test_dropping_autocapture_silences_listeners() {
        let browser = SimulatedBrowser::new("https://a.com/a").unwrap();
        let dispatcher = recording_dispatcher();
        let mut autocapture = Autocapture::new(browser.clone(), all_enabled(), dispatcher.clone());
        autocapture.init();
        drop(autocapture);

        dispatcher.clear();
        browser.scroll_to(50.0);
        browser.push_state("/b").unwrap();
        assert_eq!(dispatcher.attempts(), 0);
        assert_eq!(browser.current_url(), "https://a.com/b");
    }
}
