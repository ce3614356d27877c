//! Scaling settings consumed by the runtime core.
//!
//! A [`ScalingProfile`] is the plain serializable form (what the settings UI
//! edits and persists). A run works on [`Settings`], the shared form built
//! from a profile: everything is read-only except the draw-cursor flag,
//! which the screenshot cursor toggle flips from the keyboard hook and
//! restores later from the UI dispatch queue.
//!
//! # Example
//!
//! ```rust
//! use magnifier_runtime::config::{CaptureMode, MultiMonitorUsage, Settings};
//!
//! let settings = Settings::from_json(r#"{ "captureMode": "gdi", "multiMonitorUsage": "all" }"#)
//!     .expect("valid profile");
//! assert_eq!(settings.capture_mode(), CaptureMode::Gdi);
//! assert_eq!(settings.multi_monitor_usage(), MultiMonitorUsage::All);
//! assert!(settings.is_draw_cursor());
//! ```

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Capture backend used to read the source window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    GraphicsCapture,
    DesktopDuplication,
    Gdi,
    DwmSharedSurface,
    /// Any value this build does not know; rejected when a run starts
    #[serde(other)]
    Unsupported,
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::GraphicsCapture
    }
}

/// How the host window is placed across monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiMonitorUsage {
    /// Monitor nearest to the source window
    Nearest,
    /// Every monitor the source window overlaps
    Intersected,
    /// The whole virtual screen
    All,
}

impl Default for MultiMonitorUsage {
    fn default() -> Self {
        MultiMonitorUsage::Nearest
    }
}

/// Serializable scaling profile
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScalingProfile {
    pub capture_mode: CaptureMode,
    pub multi_monitor_usage: MultiMonitorUsage,
    pub simulate_exclusive_fullscreen: bool,
    pub disable_direct_flip: bool,
    /// Debug mode: host window is not topmost and no flip suppression window is made
    pub breakpoint_mode: bool,
    pub draw_cursor: bool,
}

impl Default for ScalingProfile {
    fn default() -> Self {
        ScalingProfile {
            capture_mode: CaptureMode::default(),
            multi_monitor_usage: MultiMonitorUsage::default(),
            simulate_exclusive_fullscreen: false,
            disable_direct_flip: false,
            breakpoint_mode: false,
            draw_cursor: true,
        }
    }
}

/// Settings shared between the orchestrator, the keyboard hook and the
/// delayed cursor restore. Held in an `Arc`; the restore only keeps a `Weak`.
#[derive(Debug)]
pub struct Settings {
    capture_mode: CaptureMode,
    multi_monitor_usage: MultiMonitorUsage,
    simulate_exclusive_fullscreen: bool,
    disable_direct_flip: bool,
    breakpoint_mode: bool,
    draw_cursor: AtomicBool,
}

impl Settings {
    pub fn from_profile(profile: &ScalingProfile) -> Self {
        Settings {
            capture_mode: profile.capture_mode,
            multi_monitor_usage: profile.multi_monitor_usage,
            simulate_exclusive_fullscreen: profile.simulate_exclusive_fullscreen,
            disable_direct_flip: profile.disable_direct_flip,
            breakpoint_mode: profile.breakpoint_mode,
            draw_cursor: AtomicBool::new(profile.draw_cursor),
        }
    }

    /// Parse a JSON scaling profile; missing keys take their defaults
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        let profile: ScalingProfile = serde_json::from_str(json)
            .map_err(|e| RuntimeError::InvalidSettings(e.to_string()))?;
        Ok(Self::from_profile(&profile))
    }

    /// Snapshot back into the serializable form
    pub fn to_profile(&self) -> ScalingProfile {
        ScalingProfile {
            capture_mode: self.capture_mode,
            multi_monitor_usage: self.multi_monitor_usage,
            simulate_exclusive_fullscreen: self.simulate_exclusive_fullscreen,
            disable_direct_flip: self.disable_direct_flip,
            breakpoint_mode: self.breakpoint_mode,
            draw_cursor: self.is_draw_cursor(),
        }
    }

    pub fn to_json(&self) -> RuntimeResult<String> {
        serde_json::to_string_pretty(&self.to_profile())
            .map_err(|e| RuntimeError::InvalidSettings(e.to_string()))
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    pub fn multi_monitor_usage(&self) -> MultiMonitorUsage {
        self.multi_monitor_usage
    }

    pub fn is_simulate_exclusive_fullscreen(&self) -> bool {
        self.simulate_exclusive_fullscreen
    }

    pub fn is_disable_direct_flip(&self) -> bool {
        self.disable_direct_flip
    }

    pub fn is_breakpoint_mode(&self) -> bool {
        self.breakpoint_mode
    }

    pub fn is_draw_cursor(&self) -> bool {
        self.draw_cursor.load(Ordering::Acquire)
    }

    pub fn set_draw_cursor(&self, value: bool) {
        self.draw_cursor.store(value, Ordering::Release);
    }

    /// Clear the draw-cursor flag; returns whether it was set before
    pub(crate) fn take_draw_cursor(&self) -> bool {
        self.draw_cursor.swap(false, Ordering::AcqRel)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_profile(&ScalingProfile::default())
    }
}
