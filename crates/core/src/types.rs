//! Event vocabulary shared by every capture subsystem: property maps, the
//! auto-capture marker, and the event names understood by the host SDK.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property map handed to the dispatcher. Keys are unique; order is irrelevant.
pub type Properties = HashMap<String, serde_json::Value>;

/// Prefix marking a property key as SDK-internal.
pub const PROPERTY_PREFIX: char = '$';

/// Property attached to every auto-captured event.
pub const AUTOCAPTURE_MARKER: &str = "$mp_autocapture";

pub const EVENT_CLICK: &str = "$mp_click";
pub const EVENT_SCROLL: &str = "$mp_scroll";

/// Name used when logging page-view dispatches. Page views are sent through
/// the dedicated page-view call, never through `track`.
pub const EVENT_PAGEVIEW: &str = "$mp_web_page_view";

pub const PROP_SCROLL_TOP: &str = "$scroll_top";
pub const PROP_SCROLL_HEIGHT: &str = "$scroll_height";
pub const PROP_SCROLL_PERCENTAGE: &str = "$scroll_percentage";

/// Kind of tracking event produced by the autocapture module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    PageView,
    Click,
    Scroll,
}

impl CaptureKind {
    pub fn event_name(self) -> &'static str {
        match self {
            CaptureKind::PageView => EVENT_PAGEVIEW,
            CaptureKind::Click => EVENT_CLICK,
            CaptureKind::Scroll => EVENT_SCROLL,
        }
    }

    /// Kind of an event handed to `track` by name. Names other than the
    /// scroll and page-view names are click events.
    pub fn from_event_name(name: &str) -> Self {
        match name {
            EVENT_SCROLL => CaptureKind::Scroll,
            EVENT_PAGEVIEW => CaptureKind::PageView,
            _ => CaptureKind::Click,
        }
    }
}

/// A finished event as seen by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingEvent {
    pub kind: CaptureKind,
    pub name: String,
    pub properties: Properties,
}

impl TrackingEvent {
    pub fn new(kind: CaptureKind, properties: Properties) -> Self {
        Self {
            kind,
            name: kind.event_name().to_string(),
            properties,
        }
    }

    pub fn is_autocaptured(&self) -> bool {
        self.properties.get(AUTOCAPTURE_MARKER) == Some(&serde_json::Value::Bool(true))
    }
}

/// The shared default properties carried by every emitted event.
pub fn default_properties() -> Properties {
    Properties::from([(AUTOCAPTURE_MARKER.to_string(), serde_json::Value::Bool(true))])
}

/// Prefix a key with [`PROPERTY_PREFIX`] unless it already carries it.
pub fn prefixed_key(key: &str) -> String {
    if key.starts_with(PROPERTY_PREFIX) {
        key.to_string()
    } else {
        format!("{PROPERTY_PREFIX}{key}")
    }
}

/// Rewrite every key of `properties` so it carries the SDK prefix.
pub fn normalize_keys(properties: Properties) -> Properties {
    properties
        .into_iter()
        .map(|(key, value)| (prefixed_key(&key), value))
        .collect()
}

/// Merge the default properties into `properties`, overwriting any collision.
pub fn with_default_properties(mut properties: Properties) -> Properties {
    properties.extend(default_properties());
    properties
}
