//! In-memory browser used by the test suites and the replay simulator.
//!
//! Models a single window: location, a session-history stack, listener
//! registry, native history entry points and page geometry. Navigation
//! follows browser semantics closely enough for autocapture: history
//! mutation fires nothing by itself, traversal fires `popstate`, and
//! fragment navigation fires `popstate` followed by `hashchange`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::trace;
use url::Url;

use crate::events::{ClickEvent, DomEvent, EventKind};
use crate::platform::{
    Capabilities, HistoryCall, HistoryHandler, HistoryMethod, Listener, ListenerId, Platform,
    PlatformError,
};

#[derive(Debug, Clone)]
struct HistoryEntry {
    url: Url,
    state: serde_json::Value,
}

pub struct SimulatedBrowser {
    capabilities: Cell<Capabilities>,
    entries: RefCell<Vec<HistoryEntry>>,
    cursor: Cell<usize>,
    listeners: RefCell<Vec<(ListenerId, EventKind, Listener)>>,
    next_listener_id: Cell<u64>,
    entry_points: RefCell<HashMap<HistoryMethod, HistoryHandler>>,
    scroll_y: Cell<f64>,
    scroll_height: Cell<Option<f64>>,
    viewport_height: Cell<Option<f64>>,
}

fn parse_url(raw: &str) -> Result<Url, PlatformError> {
    Url::parse(raw).map_err(|e| PlatformError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

impl SimulatedBrowser {
    pub const DEFAULT_SCROLL_HEIGHT: f64 = 2000.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

    /// Open a window at `url` with the native history entry points installed.
    pub fn new(url: &str) -> Result<Rc<Self>, PlatformError> {
        let url = parse_url(url)?;
        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let mut entry_points: HashMap<HistoryMethod, HistoryHandler> = HashMap::new();
            for method in HistoryMethod::ALL {
                let browser = weak.clone();
                entry_points.insert(
                    method,
                    Rc::new(move |call: &HistoryCall| match browser.upgrade() {
                        Some(browser) => browser.native_history(method, call),
                        None => Err(PlatformError::Unsupported(method)),
                    }),
                );
            }
            Self {
                capabilities: Cell::new(Capabilities::FULL),
                entries: RefCell::new(vec![HistoryEntry {
                    url,
                    state: serde_json::Value::Null,
                }]),
                cursor: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(1),
                entry_points: RefCell::new(entry_points),
                scroll_y: Cell::new(0.0),
                scroll_height: Cell::new(Some(Self::DEFAULT_SCROLL_HEIGHT)),
                viewport_height: Cell::new(Some(Self::DEFAULT_VIEWPORT_HEIGHT)),
            }
        }))
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.capabilities.set(capabilities);
    }

    /// Set page geometry; `None` makes the measurement unavailable.
    pub fn set_geometry(&self, scroll_height: Option<f64>, viewport_height: Option<f64>) {
        self.scroll_height.set(scroll_height);
        self.viewport_height.set(viewport_height);
    }

    pub fn remove_history_entry_point(&self, method: HistoryMethod) {
        self.entry_points.borrow_mut().remove(&method);
    }

    pub fn history_len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// State object of the current history entry.
    pub fn history_state(&self) -> serde_json::Value {
        self.entries.borrow()[self.cursor.get()].state.clone()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// `history.pushState` as called by the host application.
    pub fn push_state(&self, url: &str) -> Result<(), PlatformError> {
        self.invoke_history(&HistoryCall::push(url))
    }

    /// `history.replaceState` as called by the host application.
    pub fn replace_state(&self, url: &str) -> Result<(), PlatformError> {
        self.invoke_history(&HistoryCall::replace(url))
    }

    /// Traverse one entry back. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        match self.cursor.get() {
            0 => false,
            cursor => {
                self.traverse_to(cursor - 1);
                true
            }
        }
    }

    /// Traverse one entry forward. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        let next = self.cursor.get() + 1;
        if next >= self.history_len() {
            return false;
        }
        self.traverse_to(next);
        true
    }

    /// Navigate to a fragment of the current document, like assigning
    /// `location.hash`. Re-assigning the current fragment does nothing.
    pub fn set_hash(&self, fragment: &str) {
        let fragment = fragment.trim_start_matches('#');
        let mut url = self.current_location();
        if url.fragment() == Some(fragment) {
            return;
        }
        url.set_fragment(Some(fragment));
        self.push_entry(HistoryEntry {
            url,
            state: serde_json::Value::Null,
        });
        self.fire(DomEvent::PopState);
        self.fire(DomEvent::HashChange);
    }

    /// A `popstate` dispatched manually by the host, without navigation.
    pub fn dispatch_popstate(&self) {
        self.fire(DomEvent::PopState);
    }

    pub fn click(&self, event: ClickEvent) {
        self.fire(DomEvent::Click(event));
    }

    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y);
        self.fire(DomEvent::Scroll);
    }

    fn current_location(&self) -> Url {
        self.entries.borrow()[self.cursor.get()].url.clone()
    }

    fn push_entry(&self, entry: HistoryEntry) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.cursor.get() + 1);
        entries.push(entry);
        self.cursor.set(entries.len() - 1);
    }

    fn traverse_to(&self, index: usize) {
        let before = self.current_location();
        self.cursor.set(index);
        let after = self.current_location();
        self.fire(DomEvent::PopState);
        if before[..url::Position::AfterQuery] == after[..url::Position::AfterQuery]
            && before.fragment() != after.fragment()
        {
            self.fire(DomEvent::HashChange);
        }
    }

    fn native_history(&self, method: HistoryMethod, call: &HistoryCall) -> Result<(), PlatformError> {
        let current = self.current_location();
        let url = match call.url.as_deref() {
            Some(raw) => current.join(raw).map_err(|e| PlatformError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            })?,
            None => current.clone(),
        };
        if url.origin() != current.origin() {
            return Err(PlatformError::Security(format!(
                "cannot move history to {url} from origin {}",
                current.origin().ascii_serialization()
            )));
        }

        let entry = HistoryEntry {
            url,
            state: call.state.clone(),
        };
        match method {
            HistoryMethod::PushState => self.push_entry(entry),
            HistoryMethod::ReplaceState => {
                self.entries.borrow_mut()[self.cursor.get()] = entry;
            }
        }
        trace!(?method, url = %self.current_url(), "native history call");
        Ok(())
    }

    fn fire(&self, event: DomEvent) {
        let kind = event.kind();
        // Listeners may (re)register listeners, so call them outside the borrow.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Platform for SimulatedBrowser {
    fn capabilities(&self) -> Capabilities {
        self.capabilities.get()
    }

    fn current_url(&self) -> String {
        self.current_location().to_string()
    }

    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    fn history_entry_point(&self, method: HistoryMethod) -> Option<HistoryHandler> {
        self.entry_points.borrow().get(&method).cloned()
    }

    fn set_history_entry_point(&self, method: HistoryMethod, handler: HistoryHandler) {
        self.entry_points.borrow_mut().insert(method, handler);
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn document_scroll_height(&self) -> Option<f64> {
        self.scroll_height.get()
    }

    fn viewport_height(&self) -> Option<f64> {
        self.viewport_height.get()
    }
}
