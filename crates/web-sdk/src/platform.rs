//! Platform abstraction. The window/document surface the capture module
//! needs: listener registration, location, history entry points and page
//! geometry. Browsers bind this to the real globals; tests use
//! [`crate::sim::SimulatedBrowser`].

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{DomEvent, EventKind};

/// Callback registered for a browser event.
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Handle returned by [`Platform::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The two history-mutation entry points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMethod {
    PushState,
    ReplaceState,
}

impl HistoryMethod {
    pub const ALL: [HistoryMethod; 2] = [HistoryMethod::PushState, HistoryMethod::ReplaceState];
}

/// Arguments of a history-mutation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryCall {
    pub method: HistoryMethod,
    #[serde(default)]
    pub state: serde_json::Value,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl HistoryCall {
    pub fn push(url: impl Into<String>) -> Self {
        Self {
            method: HistoryMethod::PushState,
            state: serde_json::Value::Null,
            title: String::new(),
            url: Some(url.into()),
        }
    }

    pub fn replace(url: impl Into<String>) -> Self {
        Self {
            method: HistoryMethod::ReplaceState,
            ..Self::push(url)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("security error: {0}")]
    Security(String),

    #[error("history entry point {0:?} is not available")]
    Unsupported(HistoryMethod),
}

/// A history entry point. The return value is what the host application
/// observes when it calls `pushState` / `replaceState`.
pub type HistoryHandler = Rc<dyn Fn(&HistoryCall) -> Result<(), PlatformError>>;

/// Platform features autocapture needs before it arms anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub event_listeners: bool,
    pub location: bool,
    pub history: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        event_listeners: true,
        location: true,
        history: true,
    };

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.event_listeners {
            missing.push("event listeners");
        }
        if !self.location {
            missing.push("location");
        }
        if !self.history {
            missing.push("history");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

pub trait Platform {
    fn capabilities(&self) -> Capabilities;

    fn current_url(&self) -> String;

    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Returns whether a listener was actually removed.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Currently installed entry point for `method`, if the platform has one.
    fn history_entry_point(&self, method: HistoryMethod) -> Option<HistoryHandler>;

    fn set_history_entry_point(&self, method: HistoryMethod, handler: HistoryHandler);

    /// Current vertical scroll offset.
    fn scroll_y(&self) -> f64;

    /// Total scrollable content height, when measurable.
    fn document_scroll_height(&self) -> Option<f64>;

    fn viewport_height(&self) -> Option<f64>;

    /// Call whatever entry point is installed for `call.method`, as the host
    /// application would.
    fn invoke_history(&self, call: &HistoryCall) -> Result<(), PlatformError> {
        let handler = self
            .history_entry_point(call.method)
            .ok_or(PlatformError::Unsupported(call.method))?;
        handler(call)
    }
}
