//! Dispatcher seam for the host SDK's `track` / `track_pageview` calls.
//!
//! Capture subsystems hold an `Rc<dyn Dispatcher>` and hand it finished
//! property maps. The boolean result is the host's success indicator; the
//! navigation watcher only advances its dedup baseline on `true`.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::types::{CaptureKind, Properties, TrackingEvent};

/// Host SDK transport. Implementations decide where events go.
pub trait Dispatcher {
    fn track(&self, name: &str, properties: Properties) -> bool;
    fn track_pageview(&self, properties: Properties) -> bool;
}

/// A dispatch attempt as seen by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub event: TrackingEvent,
    pub accepted: bool,
}

/// In-memory dispatcher that records every attempt. Individual attempts
/// (by zero-based sequence number) or all attempts can be made to fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    records: RefCell<Vec<DispatchRecord>>,
    rejecting: Cell<bool>,
    fail_attempts: RefCell<HashSet<usize>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent attempt report failure (or success again).
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.set(rejecting);
    }

    /// Make the attempt with the given sequence number report failure.
    pub fn fail_attempt(&self, index: usize) {
        self.fail_attempts.borrow_mut().insert(index);
    }

    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records.borrow().clone()
    }

    /// Events the host accepted, in dispatch order.
    pub fn delivered(&self) -> Vec<TrackingEvent> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn count_kind(&self, kind: CaptureKind) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.event.kind == kind)
            .count()
    }

    pub fn last(&self) -> Option<DispatchRecord> {
        self.records.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    fn record(&self, event: TrackingEvent) -> bool {
        let mut records = self.records.borrow_mut();
        let accepted =
            !self.rejecting.get() && !self.fail_attempts.borrow().contains(&records.len());
        records.push(DispatchRecord { event, accepted });
        accepted
    }
}

impl Dispatcher for RecordingDispatcher {
    fn track(&self, name: &str, properties: Properties) -> bool {
        self.record(TrackingEvent {
            kind: CaptureKind::from_event_name(name),
            name: name.to_string(),
            properties,
        })
    }

    fn track_pageview(&self, properties: Properties) -> bool {
        self.record(TrackingEvent::new(CaptureKind::PageView, properties))
    }
}

/// Convenience: a recording dispatcher for tests and the simulator.
pub fn recording_dispatcher() -> Rc<RecordingDispatcher> {
    Rc::new(RecordingDispatcher::new())
}
