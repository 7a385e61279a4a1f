//! Default click target resolver for platforms that describe the clicked
//! element with an [`ElementDescriptor`].
//!
//! Block selectors support the simple compound forms `tag`, `#id`, `.class`
//! and combinations such as `a.nav#home`, optionally comma-separated.
//! Anything else (combinators, attributes, pseudo-classes) never matches.

use autocapture_core::types::Properties;
use serde_json::json;
use tracing::debug;

use crate::click::TargetResolver;
use crate::events::{ClickEvent, ElementDescriptor};

fn is_marker(c: char) -> bool {
    c == '.' || c == '#'
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SimpleSelector<'a> {
    tag: Option<&'a str>,
    id: Option<&'a str>,
    classes: Vec<&'a str>,
}

impl<'a> SimpleSelector<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.contains(|c: char| c.is_whitespace() || "[]:>+~*()".contains(c))
        {
            return None;
        }

        let tag_end = raw.find(is_marker).unwrap_or(raw.len());
        let mut selector = SimpleSelector {
            tag: Some(&raw[..tag_end]).filter(|t| !t.is_empty()),
            ..Default::default()
        };

        let mut rest = &raw[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(is_marker).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '#' => selector.id = Some(name),
                _ => selector.classes.push(name),
            }
            rest = &body[end..];
        }
        Some(selector)
    }

    fn matches(&self, element: &ElementDescriptor) -> bool {
        self.tag
            .map_or(true, |tag| tag.eq_ignore_ascii_case(&element.tag_name))
            && self
                .id
                .map_or(true, |id| element.id.as_deref() == Some(id))
            && self
                .classes
                .iter()
                .all(|class| element.classes.iter().any(|c| c == class))
    }
}

/// Whether `element` matches any selector in `block_selectors`.
pub fn is_blocked(element: &ElementDescriptor, block_selectors: &[String]) -> bool {
    block_selectors
        .iter()
        .flat_map(|list| list.split(','))
        .any(|raw| match SimpleSelector::parse(raw) {
            Some(selector) => selector.matches(element),
            None => {
                debug!(selector = raw, "unsupported block selector ignored");
                false
            }
        })
}

/// Describes the clicked element with `$el_*` properties.
pub struct ElementTargetResolver;

impl TargetResolver for ElementTargetResolver {
    fn properties_for_click(
        &self,
        event: &ClickEvent,
        block_selectors: &[String],
    ) -> Option<Properties> {
        let element = event.target.as_ref()?;
        if element.tag_name.is_empty() || is_blocked(element, block_selectors) {
            return None;
        }

        let mut props = Properties::from([(
            "$el_tag_name".to_string(),
            json!(element.tag_name.to_ascii_lowercase()),
        )]);
        if let Some(id) = &element.id {
            props.insert("$el_id".to_string(), json!(id));
        }
        if !element.classes.is_empty() {
            props.insert("$el_classes".to_string(), json!(element.classes));
        }
        if let Some(text) = element.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            props.insert("$el_text".to_string(), json!(text));
        }
        if let Some(href) = &element.href {
            props.insert("$el_href".to_string(), json!(href));
        }
        Some(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> ElementDescriptor {
        ElementDescriptor {
            tag_name: "BUTTON".into(),
            id: Some("buy-btn".into()),
            classes: vec!["btn".into(), "btn-primary".into()],
            text: Some("  Buy Now ".into()),
            href: None,
        }
    }

    #[test]
    fn test_parse_compound_selector() {
        let selector = SimpleSelector::parse("button.btn#buy-btn").unwrap();
        assert_eq!(selector.tag, Some("button"));
        assert_eq!(selector.id, Some("buy-btn"));
        assert_eq!(selector.classes, vec!["btn"]);
        assert!(SimpleSelector::parse("div > a").is_none());
        assert!(SimpleSelector::parse("a.").is_none());
    }

    #[test]
    fn test_block_selector_forms() {
        let el = button();
        for selector in ["button", "#buy-btn", ".btn-primary", "button.btn", ".btn.btn-primary"] {
            assert!(is_blocked(&el, &[selector.to_string()]), "{selector}");
        }
        for selector in ["a", "#other", ".btn-secondary", "a.btn", "[data-x]"] {
            assert!(!is_blocked(&el, &[selector.to_string()]), "{selector}");
        }
        assert!(is_blocked(&el, &["a, .btn".to_string()]));
    }

    #[test]
    fn test_properties_for_click() {
        let props = ElementTargetResolver
            .properties_for_click(&ClickEvent::on(button()), &[])
            .unwrap();
        assert_eq!(props.get("$el_tag_name"), Some(&json!("button")));
        assert_eq!(props.get("$el_id"), Some(&json!("buy-btn")));
        assert_eq!(props.get("$el_classes"), Some(&json!(["btn", "btn-primary"])));
        assert_eq!(props.get("$el_text"), Some(&json!("Buy Now")));
        assert!(!props.contains_key("$el_href"));
    }

    #[test]
    fn test_blocked_or_missing_target_is_ignored() {
        let resolver = ElementTargetResolver;
        assert!(resolver
            .properties_for_click(&ClickEvent::on(button()), &[".btn".to_string()])
            .is_none());
        assert!(resolver
            .properties_for_click(&ClickEvent::default(), &[])
            .is_none());
    }
}
