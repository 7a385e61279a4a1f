//! Scripted browser sessions replayed against the autocapture module.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use anyhow::Context;
use autocapture_core::config::StaticConfig;
use autocapture_core::dispatch::Dispatcher;
use autocapture_core::types::{CaptureKind, Properties, TrackingEvent};
use autocapture_web_sdk::events::ClickEvent;
use autocapture_web_sdk::platform::{Capabilities, HistoryCall, HistoryMethod};
use autocapture_web_sdk::{Autocapture, Platform, SimulatedBrowser};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Geometry {
    pub scroll_height: Option<f64>,
    pub viewport_height: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// URL the window opens at.
    pub url: String,
    /// Host SDK configuration (`autocapture` namespace, `track_pageview`).
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub capabilities: Option<Capabilities>,
    /// Zero-based dispatch attempts the host should reject.
    #[serde(default)]
    pub fail_dispatches: Vec<usize>,
    /// Run `init` before the first step.
    #[serde(default = "default_auto_init")]
    pub auto_init: bool,
    pub steps: Vec<Step>,
}

fn default_auto_init() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Init,
    PushState {
        url: String,
        #[serde(default)]
        state: serde_json::Value,
    },
    ReplaceState {
        url: String,
        #[serde(default)]
        state: serde_json::Value,
    },
    Back,
    Forward,
    SetHash {
        fragment: String,
    },
    HostPopstate,
    Click {
        #[serde(default)]
        event: ClickEvent,
    },
    Scroll {
        y: f64,
    },
    SetGeometry {
        scroll_height: Option<f64>,
        viewport_height: Option<f64>,
    },
    SetConfig {
        key: String,
        value: serde_json::Value,
    },
}

/// One dispatch attempt, as printed by the simulator.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchLine {
    pub run_id: Uuid,
    pub seq: usize,
    pub at: DateTime<Utc>,
    pub kind: CaptureKind,
    pub name: String,
    pub url: String,
    pub accepted: bool,
    pub properties: Properties,
}

/// Host dispatcher for replays: records every attempt and rejects the
/// configured ones.
pub struct ReplayDispatcher {
    run_id: Uuid,
    browser: Rc<SimulatedBrowser>,
    reject: HashSet<usize>,
    seq: Cell<usize>,
    lines: RefCell<Vec<DispatchLine>>,
}

impl ReplayDispatcher {
    pub fn new(run_id: Uuid, browser: Rc<SimulatedBrowser>, reject: &[usize]) -> Self {
        Self {
            run_id,
            browser,
            reject: reject.iter().copied().collect(),
            seq: Cell::new(0),
            lines: RefCell::new(Vec::new()),
        }
    }

    pub fn take_lines(&self) -> Vec<DispatchLine> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }

    fn record(&self, event: TrackingEvent) -> bool {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        let accepted = !self.reject.contains(&seq);
        self.lines.borrow_mut().push(DispatchLine {
            run_id: self.run_id,
            seq,
            at: Utc::now(),
            kind: event.kind,
            name: event.name,
            url: self.browser.current_url(),
            accepted,
            properties: event.properties,
        });
        accepted
    }
}

impl Dispatcher for ReplayDispatcher {
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

/// Replay `scenario`, returning every dispatch attempt in order.
pub fn run(scenario: &Scenario, run_id: Uuid) -> anyhow::Result<Vec<DispatchLine>> {
    let browser = SimulatedBrowser::new(&scenario.url)
        .with_context(|| format!("cannot open scenario URL {:?}", scenario.url))?;
    if let Some(geometry) = scenario.geometry {
        browser.set_geometry(geometry.scroll_height, geometry.viewport_height);
    }
    if let Some(capabilities) = scenario.capabilities {
        browser.set_capabilities(capabilities);
    }

    let config = Rc::new(StaticConfig::from_json(scenario.config.clone()));
    let dispatcher = Rc::new(ReplayDispatcher::new(
        run_id,
        browser.clone(),
        &scenario.fail_dispatches,
    ));
    let mut autocapture = Autocapture::new(browser.clone(), config.clone(), dispatcher.clone());

    if scenario.auto_init {
        autocapture.init();
    }
    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, ?step, "replaying step");
        apply(step, &browser, &config, &mut autocapture);
    }

    let lines = dispatcher.take_lines();
    info!(
        %run_id,
        steps = scenario.steps.len(),
        dispatched = lines.len(),
        accepted = lines.iter().filter(|l| l.accepted).count(),
        "scenario replayed"
    );
    Ok(lines)
}

fn apply(
    step: &Step,
    browser: &SimulatedBrowser,
    config: &StaticConfig,
    autocapture: &mut Autocapture,
) {
    let history = |method: HistoryMethod, url: &str, state: &serde_json::Value| {
        let call = HistoryCall {
            method,
            state: state.clone(),
            title: String::new(),
            url: Some(url.to_string()),
        };
        if let Err(e) = browser.invoke_history(&call) {
            warn!(error = %e, ?method, url, "host history call failed");
        }
    };

    match step {
        Step::Init => autocapture.init(),
        Step::PushState { url, state } => history(HistoryMethod::PushState, url, state),
        Step::ReplaceState { url, state } => history(HistoryMethod::ReplaceState, url, state),
        Step::Back => {
            if !browser.back() {
                warn!("back: already at the first history entry");
            }
        }
        Step::Forward => {
            if !browser.forward() {
                warn!("forward: already at the last history entry");
            }
        }
        Step::SetHash { fragment } => browser.set_hash(fragment),
        Step::HostPopstate => browser.dispatch_popstate(),
        Step::Click { event } => browser.click(event.clone()),
        Step::Scroll { y } => browser.scroll_to(*y),
        Step::SetGeometry {
            scroll_height,
            viewport_height,
        } => browser.set_geometry(*scroll_height, *viewport_height),
        Step::SetConfig { key, value } => config.set(key.clone(), value.clone()),
    }
}
