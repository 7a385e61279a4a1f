//! Capture configuration: the host SDK's `autocapture` namespace, the legacy
//! `track_pageview` flag, and the provider seam used to read them.

use std::cell::RefCell;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CaptureError, CaptureResult};

/// Host config key holding the autocapture namespace.
pub const AUTOCAPTURE_CONFIG_KEY: &str = "autocapture";
/// Top-level legacy key consulted when the namespace has no `pageview` entry.
pub const LEGACY_PAGEVIEW_CONFIG_KEY: &str = "track_pageview";

pub const CONFIG_TRACK_CLICK: &str = "click";
pub const CONFIG_TRACK_SCROLL: &str = "scroll";
pub const CONFIG_TRACK_PAGEVIEW: &str = "pageview";

/// Read access to the host SDK's configuration. Every call is a fresh read;
/// implementations must not assume the value is stable between calls.
pub trait ConfigProvider {
    fn get_config(&self, key: &str) -> Option<serde_json::Value>;
}

/// In-memory provider backed by a JSON object whose entries may be replaced
/// while the module is running.
#[derive(Debug, Default)]
pub struct StaticConfig {
    values: RefCell<serde_json::Map<String, serde_json::Value>>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from a JSON object. Non-object values yield an empty provider.
    pub fn from_json(value: serde_json::Value) -> Self {
        let values = match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            values: RefCell::new(values),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.values.borrow_mut().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.values.borrow_mut().remove(key)
    }
}

impl ConfigProvider for StaticConfig {
    fn get_config(&self, key: &str) -> Option<serde_json::Value> {
        self.values.borrow().get(key).cloned()
    }
}

/// Page-view comparison granularity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PageviewMode {
    #[default]
    Disabled,
    FullUrl,
    UrlWithPathAndQueryString,
    UrlWithPath,
}

impl FromStr for PageviewMode {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-url" => Ok(PageviewMode::FullUrl),
            "url-with-path-and-query-string" => Ok(PageviewMode::UrlWithPathAndQueryString),
            "url-with-path" => Ok(PageviewMode::UrlWithPath),
            other => Err(CaptureError::Config(format!(
                "unrecognized pageview mode {other:?}"
            ))),
        }
    }
}

impl PageviewMode {
    /// Interpret a `pageview` / `track_pageview` setting. A bare `true` is the
    /// full-url equivalent; anything unusable disables page-view tracking.
    pub fn from_setting(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(true) => PageviewMode::FullUrl,
            serde_json::Value::Bool(false) | serde_json::Value::Null => PageviewMode::Disabled,
            serde_json::Value::String(s) => s.parse::<PageviewMode>().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring pageview setting");
                PageviewMode::Disabled
            }),
            other => {
                warn!(setting = %other, "pageview setting must be a bool or mode string");
                PageviewMode::Disabled
            }
        }
    }

    pub fn is_enabled(self) -> bool {
        self != PageviewMode::Disabled
    }
}

/// Raw shape of the `autocapture` namespace. `pageview` is resolved
/// separately because its mere presence decides whether the legacy flag applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutocaptureSettings {
    #[serde(default)]
    pub click: bool,
    #[serde(default)]
    pub scroll: bool,
    #[serde(default)]
    pub block_selectors: Vec<String>,
    #[serde(default)]
    pub block_url_regexes: Vec<String>,
}

impl AutocaptureSettings {
    pub fn from_value(value: serde_json::Value) -> CaptureResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Per-check snapshot of the capture configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureConfig {
    pub click_enabled: bool,
    pub scroll_enabled: bool,
    pub pageview_mode: PageviewMode,
    pub block_selectors: Vec<String>,
    pub block_url_regexes: Vec<String>,
}

impl CaptureConfig {
    /// Take a fresh snapshot from `provider`.
    pub fn resolve(provider: &dyn ConfigProvider) -> Self {
        let namespace = provider
            .get_config(AUTOCAPTURE_CONFIG_KEY)
            .unwrap_or(serde_json::Value::Null);

        let pageview_mode = Self::resolve_pageview_mode(provider, &namespace);

        let settings = AutocaptureSettings::from_value(namespace).unwrap_or_else(|e| {
            warn!(error = %e, "malformed autocapture config, capture disabled");
            AutocaptureSettings::default()
        });

        Self {
            click_enabled: settings.click,
            scroll_enabled: settings.scroll,
            pageview_mode,
            block_selectors: settings.block_selectors,
            block_url_regexes: settings.block_url_regexes,
        }
    }

    /// Resolve only the page-view mode, honouring the legacy fallback.
    pub fn resolve_pageview_mode(
        provider: &dyn ConfigProvider,
        namespace: &serde_json::Value,
    ) -> PageviewMode {
        match namespace.get(CONFIG_TRACK_PAGEVIEW) {
            Some(setting) => PageviewMode::from_setting(setting),
            None => provider
                .get_config(LEGACY_PAGEVIEW_CONFIG_KEY)
                .map(|legacy| PageviewMode::from_setting(&legacy))
                .unwrap_or_default(),
        }
    }
}
