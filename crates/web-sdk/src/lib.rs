//! Browser autocapture — turns clicks, scroll position and single-page-app
//! navigation into tracking events for the host SDK.
//!
//! # Modules
//!
//! - [`platform`] - window/document abstraction the module runs against
//! - [`gate`] - feature flags and fail-closed URL blocking
//! - [`navigation`] - page-view detection over history, hash and popstate signals
//! - [`click`] / [`scroll`] - click and scroll-depth capture
//! - [`resolver`] - default click target resolver
//! - [`autocapture`] - lifecycle entry point
//! - [`sim`] - in-memory browser for tests and replay

pub mod autocapture;
pub mod click;
pub mod context;
pub mod events;
pub mod gate;
pub mod history;
pub mod navigation;
pub mod platform;
pub mod resolver;
pub mod scroll;
pub mod sim;

pub use autocapture::{Autocapture, LifecycleState};
pub use click::{ClickCapture, TargetResolver};
pub use context::{CaptureContext, CaptureOutcome};
pub use gate::{ConfigGate, Feature};
pub use navigation::NavigationWatcher;
pub use platform::Platform;
pub use resolver::ElementTargetResolver;
pub use scroll::ScrollCapture;
pub use sim::SimulatedBrowser;
