//! Browser event types observed by the capture subsystems: click and scroll
//! notifications, navigation signals, and the scroll-depth payload.

use autocapture_core::types::{
    Properties, PROP_SCROLL_HEIGHT, PROP_SCROLL_PERCENTAGE, PROP_SCROLL_TOP,
};
use serde::{Deserialize, Serialize};

/// Browser event kinds a listener can be registered for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Scroll,
    PopState,
    HashChange,
}

/// Event delivered to a registered listener.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Click(ClickEvent),
    Scroll,
    PopState,
    HashChange,
}

impl DomEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomEvent::Click(_) => EventKind::Click,
            DomEvent::Scroll => EventKind::Scroll,
            DomEvent::PopState => EventKind::PopState,
            DomEvent::HashChange => EventKind::HashChange,
        }
    }
}

/// The element a click landed on, as far as the platform can describe it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementDescriptor {
    pub tag_name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

/// Native click event. Pointer fields are present only when the originating
/// event carried them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    #[serde(default)]
    pub target: Option<ElementDescriptor>,
    #[serde(default)]
    pub client_x: Option<f64>,
    #[serde(default)]
    pub client_y: Option<f64>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub page_x: Option<f64>,
    #[serde(default)]
    pub page_y: Option<f64>,
    #[serde(default)]
    pub screen_x: Option<f64>,
    #[serde(default)]
    pub screen_y: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

impl ClickEvent {
    pub fn on(target: ElementDescriptor) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    /// Recognized pointer coordinates present on this event, keyed by their
    /// native field names.
    pub fn coordinates(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("clientX", self.client_x),
            ("clientY", self.client_y),
            ("offsetX", self.offset_x),
            ("offsetY", self.offset_y),
            ("pageX", self.page_x),
            ("pageY", self.page_y),
            ("screenX", self.screen_x),
            ("screenY", self.screen_y),
            ("x", self.x),
            ("y", self.y),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Scroll depth payload. The derived fields are present only when the page
/// geometry could be measured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: Option<f64>,
    pub scroll_percentage: Option<u8>,
}

impl ScrollMetrics {
    pub fn into_properties(self) -> Properties {
        let mut props = Properties::from([(
            PROP_SCROLL_TOP.to_string(),
            serde_json::json!(self.scroll_top),
        )]);
        if let Some(height) = self.scroll_height {
            props.insert(PROP_SCROLL_HEIGHT.to_string(), serde_json::json!(height));
        }
        if let Some(pct) = self.scroll_percentage {
            props.insert(PROP_SCROLL_PERCENTAGE.to_string(), serde_json::json!(pct));
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_coordinates_only_present_fields() {
        let click = ClickEvent {
            client_x: Some(10.0),
            client_y: Some(20.0),
            ..Default::default()
        };
        let coords: Vec<_> = click.coordinates().collect();
        assert_eq!(coords, vec![("clientX", 10.0), ("clientY", 20.0)]);
    }

    #[test]
    fn test_click_event_serde_uses_native_names() {
        let click: ClickEvent = serde_json::from_value(serde_json::json!({
            "clientX": 4.0,
            "pageY": 900.5,
            "target": { "tag_name": "button", "classes": ["cta"] }
        }))
        .unwrap();
        assert_eq!(click.client_x, Some(4.0));
        assert_eq!(click.page_y, Some(900.5));
        assert_eq!(click.target.unwrap().classes, vec!["cta".to_string()]);
    }

    #[test]
    fn test_scroll_metrics_degraded_properties() {
        let props = ScrollMetrics {
            scroll_top: 120.0,
            scroll_height: None,
            scroll_percentage: None,
        }
        .into_properties();
        assert_eq!(props.len(), 1);
        assert!(props.contains_key(PROP_SCROLL_TOP));
    }

    #[test]
    fn test_scroll_metrics_full_properties() {
        let props = ScrollMetrics {
            scroll_top: 500.0,
            scroll_height: Some(2000.0),
            scroll_percentage: Some(50),
        }
        .into_properties();
        assert_eq!(props.len(), 3);
        assert_eq!(props.get(PROP_SCROLL_PERCENTAGE), Some(&serde_json::json!(50)));
    }
}
