//! ClickCapture turns clicks on capturable elements into `$mp_click` events.

use std::rc::{Rc, Weak};

use autocapture_core::types::{normalize_keys, prefixed_key, CaptureKind, Properties};
use tracing::{debug, trace};

use crate::context::{CaptureContext, CaptureOutcome};
use crate::events::{ClickEvent, DomEvent, EventKind};
use crate::gate::Feature;
use crate::platform::ListenerId;

/// Maps a click to the properties describing its target, or `None` when the
/// click should be ignored (blocked selector, nothing capturable).
pub trait TargetResolver {
    fn properties_for_click(&self, event: &ClickEvent, block_selectors: &[String])
        -> Option<Properties>;
}

/// Handle one click notification.
pub fn handle_click(
    context: &CaptureContext,
    resolver: &dyn TargetResolver,
    event: &ClickEvent,
) -> CaptureOutcome {
    if context.gate.is_current_url_blocked() {
        return CaptureOutcome::Blocked;
    }

    let Some(target) = resolver.properties_for_click(event, &context.gate.block_selectors())
    else {
        trace!("click target ignored");
        return CaptureOutcome::Skipped;
    };

    let mut props = normalize_keys(target);
    for (name, value) in event.coordinates() {
        props.insert(prefixed_key(name), serde_json::json!(value));
    }
    context.dispatch(CaptureKind::Click, props)
}

pub struct ClickCapture {
    context: Rc<CaptureContext>,
    resolver: Rc<dyn TargetResolver>,
    listener: Option<ListenerId>,
}

impl ClickCapture {
    pub fn new(context: Rc<CaptureContext>, resolver: Rc<dyn TargetResolver>) -> Self {
        Self {
            context,
            resolver,
            listener: None,
        }
    }

    /// Swap the target resolver. An installed listener is kept and switches
    /// to `resolver` on its next arming.
    pub fn set_resolver(&mut self, resolver: Rc<dyn TargetResolver>) {
        self.resolver = resolver;
    }

    /// Remove any listener from a previous arming, then install a new one if
    /// click capture is enabled. Returns whether a listener is installed.
    pub fn arm(&mut self) -> bool {
        if let Some(id) = self.listener.take() {
            self.context.platform.remove_listener(id);
        }

        if !self.context.gate.is_enabled(Feature::Click) {
            debug!("click capture disabled");
            return false;
        }

        let context: Weak<CaptureContext> = Rc::downgrade(&self.context);
        let resolver = self.resolver.clone();
        let id = self.context.platform.add_listener(
            EventKind::Click,
            Rc::new(move |event: &DomEvent| {
                if let (DomEvent::Click(click), Some(context)) = (event, context.upgrade()) {
                    handle_click(&context, resolver.as_ref(), click);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ElementTargetResolver;
    use crate::sim::SimulatedBrowser;
    use autocapture_core::config::StaticConfig;
    use autocapture_core::dispatch::{recording_dispatcher, RecordingDispatcher};
    use autocapture_core::types::{AUTOCAPTURE_MARKER, EVENT_CLICK};
    use serde_json::json;

    /// Resolver returning a fixed answer regardless of the click.
    struct FixedResolver(Option<Properties>);

    impl TargetResolver for FixedResolver {
        fn properties_for_click(&self, _: &ClickEvent, _: &[String]) -> Option<Properties> {
            self.0.clone()
        }
    }

    fn setup(
        config: serde_json::Value,
        resolver: Rc<dyn TargetResolver>,
    ) -> (Rc<SimulatedBrowser>, Rc<RecordingDispatcher>, ClickCapture) {
        let browser = SimulatedBrowser::new("https://a.com/home").unwrap();
        let dispatcher = recording_dispatcher();
        let context = Rc::new(CaptureContext::new(
            browser.clone(),
            Rc::new(StaticConfig::from_json(config)),
            dispatcher.clone(),
        ));
        (browser, dispatcher, ClickCapture::new(context, resolver))
    }

    #[test]
    fn test_empty_target_map_gets_coordinates_and_marker() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(FixedResolver(Some(Properties::new()))),
        );
        assert!(capture.arm());

        browser.click(ClickEvent {
            client_x: Some(10.0),
            client_y: Some(20.0),
            ..Default::default()
        });

        let record = dispatcher.last().unwrap();
        assert_eq!(record.event.name, EVENT_CLICK);
        let props = record.event.properties;
        assert_eq!(props.len(), 3);
        assert_eq!(props.get("$clientX"), Some(&json!(10.0)));
        assert_eq!(props.get("$clientY"), Some(&json!(20.0)));
        assert_eq!(props.get(AUTOCAPTURE_MARKER), Some(&json!(true)));
    }

    #[test]
    fn test_ignored_target_is_dropped() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(FixedResolver(None)),
        );
        capture.arm();
        browser.click(ClickEvent::default());
        assert_eq!(dispatcher.attempts(), 0);
    }

    #[test]
    fn test_blocked_url_drops_click() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true, "block_url_regexes": ["/home$"] } }),
            Rc::new(FixedResolver(Some(Properties::new()))),
        );
        capture.arm();
        browser.click(ClickEvent::default());
        assert_eq!(dispatcher.attempts(), 0);

        browser.push_state("/other").unwrap();
        browser.click(ClickEvent::default());
        assert_eq!(dispatcher.attempts(), 1);
    }

    #[test]
    fn test_resolver_keys_are_prefixed() {
        let target = Properties::from([("el_tag_name".to_string(), json!("a"))]);
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(FixedResolver(Some(target))),
        );
        capture.arm();
        browser.click(ClickEvent::default());
        let props = dispatcher.last().unwrap().event.properties;
        assert_eq!(props.get("$el_tag_name"), Some(&json!("a")));
        assert!(props.keys().all(|k| k.starts_with('$')));
    }

    #[test]
    fn test_rearm_is_idempotent() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(ElementTargetResolver),
        );
        capture.arm();
        capture.arm();
        assert_eq!(browser.listener_count(EventKind::Click), 1);

        browser.click(ClickEvent::on(crate::events::ElementDescriptor {
            tag_name: "button".into(),
            ..Default::default()
        }));
        assert_eq!(dispatcher.attempts(), 1);
    }

    #[test]
    fn test_resolver_swap_then_rearm_keeps_one_listener() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(FixedResolver(None)),
        );
        capture.arm();
        capture.set_resolver(Rc::new(FixedResolver(Some(Properties::new()))));
        capture.arm();
        assert_eq!(browser.listener_count(EventKind::Click), 1);

        browser.click(ClickEvent::default());
        assert_eq!(dispatcher.attempts(), 1);
    }

    #[test]
    fn test_rearm_with_click_disabled_removes_listener() {
        let (browser, _, mut capture) = setup(
            json!({ "autocapture": { "click": false } }),
            Rc::new(ElementTargetResolver),
        );
        assert!(!capture.arm());
        assert!(!capture.is_armed());
        assert_eq!(browser.listener_count(EventKind::Click), 0);
    }

    #[test]
    fn test_dispatch_failure_is_not_retried() {
        let (browser, dispatcher, mut capture) = setup(
            json!({ "autocapture": { "click": true } }),
            Rc::new(FixedResolver(Some(Properties::new()))),
        );
        capture.arm();
        dispatcher.set_rejecting(true);
        browser.click(ClickEvent::default());
        assert_eq!(dispatcher.attempts(), 1);
        assert!(dispatcher.delivered().is_empty());
    }
}
