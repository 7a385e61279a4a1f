//! Shared building blocks for the autocapture module: configuration snapshot,
//! event vocabulary, dispatcher seam, and the error taxonomy.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod types;

pub use config::{CaptureConfig, ConfigProvider, PageviewMode, StaticConfig};
pub use dispatch::{Dispatcher, RecordingDispatcher};
pub use error::{CaptureError, CaptureResult};
pub use types::{Properties, TrackingEvent};
