//! ConfigGate: feature flags and URL blocking, evaluated against a fresh
//! configuration snapshot on every call.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use autocapture_core::config::{
    CaptureConfig, ConfigProvider, PageviewMode, CONFIG_TRACK_CLICK, CONFIG_TRACK_PAGEVIEW,
    CONFIG_TRACK_SCROLL,
};
use autocapture_core::error::{CaptureError, CaptureResult};
use regex::Regex;
use tracing::{error, trace};

use crate::platform::Platform;

/// Capture features that can be switched on and off by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Click,
    Scroll,
    Pageview,
}

impl Feature {
    pub fn config_key(self) -> &'static str {
        match self {
            Feature::Click => CONFIG_TRACK_CLICK,
            Feature::Scroll => CONFIG_TRACK_SCROLL,
            Feature::Pageview => CONFIG_TRACK_PAGEVIEW,
        }
    }
}

pub struct ConfigGate {
    provider: Rc<dyn ConfigProvider>,
    platform: Rc<dyn Platform>,
    // Compilation results keyed by pattern text. Configuration is still read
    // fresh on every check; only the compile step is reused.
    compiled: RefCell<HashMap<String, Result<Regex, regex::Error>>>,
}

impl ConfigGate {
    pub fn new(provider: Rc<dyn ConfigProvider>, platform: Rc<dyn Platform>) -> Self {
        Self {
            provider,
            platform,
            compiled: RefCell::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> CaptureConfig {
        CaptureConfig::resolve(self.provider.as_ref())
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        let config = self.snapshot();
        let enabled = match feature {
            Feature::Click => config.click_enabled,
            Feature::Scroll => config.scroll_enabled,
            Feature::Pageview => config.pageview_mode.is_enabled(),
        };
        trace!(feature = feature.config_key(), enabled, "feature flag read");
        enabled
    }

    pub fn pageview_mode(&self) -> PageviewMode {
        self.snapshot().pageview_mode
    }

    pub fn block_selectors(&self) -> Vec<String> {
        self.snapshot().block_selectors
    }

    /// Whether capture is blocked on the page currently shown. Fail-closed:
    /// a pattern that cannot be evaluated blocks the page.
    pub fn is_current_url_blocked(&self) -> bool {
        let patterns = self.snapshot().block_url_regexes;
        if patterns.is_empty() {
            return false;
        }
        self.is_url_blocked(&self.platform.current_url(), &patterns)
    }

    /// Evaluate `patterns` in order against `url`, stopping at the first
    /// match or the first evaluation error.
    pub fn is_url_blocked(&self, url: &str, patterns: &[String]) -> bool {
        for pattern in patterns {
            match self.matches(pattern, url) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    error!(error = %e, url, "block URL check failed, treating page as blocked");
                    return true;
                }
            }
        }
        false
    }

    fn matches(&self, pattern: &str, url: &str) -> CaptureResult<bool> {
        let mut compiled = self.compiled.borrow_mut();
        let regex = compiled
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(pattern));
        match regex {
            Ok(regex) => Ok(regex.is_match(url)),
            Err(source) => Err(CaptureError::BlockRegexEvaluation {
                pattern: pattern.to_string(),
                source: source.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedBrowser;
    use autocapture_core::config::StaticConfig;
    use serde_json::json;

    fn gate_at(url: &str, config: serde_json::Value) -> (ConfigGate, Rc<StaticConfig>) {
        let provider = Rc::new(StaticConfig::from_json(config));
        let browser = SimulatedBrowser::new(url).unwrap();
        (ConfigGate::new(provider.clone(), browser), provider)
    }

    #[test]
    fn test_no_patterns_never_blocks() {
        let (gate, _) = gate_at("https://a.com/admin", json!({ "autocapture": {} }));
        assert!(!gate.is_current_url_blocked());
    }

    #[test]
    fn test_matching_pattern_blocks() {
        let (gate, _) = gate_at(
            "https://a.com/admin/x",
            json!({ "autocapture": { "block_url_regexes": ["^https://a\\.com/admin"] } }),
        );
        assert!(gate.is_current_url_blocked());
    }

    #[test]
    fn test_unanchored_pattern_matches_anywhere() {
        let (gate, _) = gate_at(
            "https://a.com/shop/checkout?step=2",
            json!({ "autocapture": { "block_url_regexes": ["nomatch", "checkout"] } }),
        );
        assert!(gate.is_current_url_blocked());
    }

    #[test]
    fn test_non_matching_patterns_allow() {
        let (gate, _) = gate_at(
            "https://a.com/public",
            json!({ "autocapture": { "block_url_regexes": ["^https://a\\.com/admin", "secret"] } }),
        );
        assert!(!gate.is_current_url_blocked());
    }

    #[test]
    fn test_invalid_pattern_fails_closed() {
        let (gate, _) = gate_at(
            "https://a.com/public",
            json!({ "autocapture": { "block_url_regexes": ["("] } }),
        );
        assert!(gate.is_current_url_blocked());
        // cached compile error still blocks
        assert!(gate.is_current_url_blocked());
    }

    #[test]
    fn test_patterns_evaluated_in_order() {
        let (gate, _) = gate_at("https://a.com/public", json!({}));
        let patterns = vec!["public".to_string(), "(".to_string()];
        assert!(gate.is_url_blocked("https://a.com/public", &patterns));
        let patterns = vec!["private".to_string(), "(".to_string()];
        assert!(gate.is_url_blocked("https://a.com/public", &patterns));
    }

    #[test]
    fn test_config_changes_are_seen_immediately() {
        let (gate, provider) = gate_at("https://a.com/x", json!({ "autocapture": { "click": true } }));
        assert!(gate.is_enabled(Feature::Click));
        assert!(!gate.is_enabled(Feature::Scroll));

        provider.set(
            "autocapture",
            json!({ "click": false, "scroll": true, "block_url_regexes": ["/x$"] }),
        );
        assert!(!gate.is_enabled(Feature::Click));
        assert!(gate.is_enabled(Feature::Scroll));
        assert!(gate.is_current_url_blocked());
    }

    #[test]
    fn test_pageview_feature_follows_mode() {
        let (gate, _) = gate_at("https://a.com/", json!({ "track_pageview": "url-with-path" }));
        assert!(gate.is_enabled(Feature::Pageview));
        assert_eq!(gate.pageview_mode(), PageviewMode::UrlWithPath);
        assert_eq!(Feature::Pageview.config_key(), "pageview");
    }
}
