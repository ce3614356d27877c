//! Magnifier runtime core
//!
//! Orchestrates a real-time magnification run over a source window: host
//! window placement across monitors, capture backend selection, the
//! message/render loop, DirectFlip suppression, print-screen cursor hiding
//! and ordered teardown. GPU, capture and effect implementations plug in
//! through [`subsystems::Subsystems`]; OS windowing goes through
//! [`platform::Platform`].

pub mod app;
pub mod config;
pub mod cursor_toggle;
pub mod delayed_task;
pub mod dispatcher;
pub mod effect_chain;
pub mod error;
pub mod geometry;
pub mod handler_chain;
pub mod logging;
mod pipeline;
pub mod platform;
pub mod shared_resource;
pub mod subsystems;

#[cfg(test)]
mod testing;

pub use app::{MagApp, RunControl, RunOutcome, RunState};
pub use config::{CaptureMode, MultiMonitorUsage, ScalingProfile, Settings};
pub use dispatcher::UiDispatcher;
pub use error::{RuntimeError, RuntimeResult, Severity};
pub use platform::{Platform, SourceWindow};

#[cfg(windows)]
pub use platform::windows::Win32Platform;
