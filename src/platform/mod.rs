//! Windowing surface the orchestrator drives
//!
//! [`Platform`] is everything the core needs from the OS: window classes and
//! windows, layered alpha and z-order, monitor geometry, the low-level
//! keyboard hook and a non-blocking message pump. The Win32 implementation
//! lives in [`windows`]; tests drive the orchestrator through a scripted fake.

use std::any::Any;
use std::rc::Rc;

use crate::error::RuntimeResult;
use crate::geometry::{DisplayTopology, Rect};
use crate::handler_chain::HandlerChain;

#[cfg(windows)]
pub mod windows;

/// Native handle of the window being magnified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceWindow(isize);

impl SourceWindow {
    pub const fn from_raw(handle: isize) -> Self {
        Self(handle)
    }

    pub const fn raw(&self) -> isize {
        self.0
    }
}

/// Native handle of a window created by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub const fn from_raw(handle: isize) -> Self {
        Self(handle)
    }

    pub const fn raw(&self) -> isize {
        self.0
    }
}

/// Installed low-level keyboard hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookHandle(isize);

impl HookHandle {
    pub const fn from_raw(handle: isize) -> Self {
        Self(handle)
    }

    pub const fn raw(&self) -> isize {
        self.0
    }
}

/// Result of draining the pending message queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Queue is empty, keep rendering
    Idle,
    /// A quit message was retrieved
    Quit,
}

/// Host OS version, compared lexicographically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// First release honoring `WDA_EXCLUDEFROMCAPTURE` (Windows 10 2004)
    pub const EXCLUDE_FROM_CAPTURE: OsVersion = OsVersion::new(10, 0, 19041);

    pub fn supports_capture_exclusion(&self) -> bool {
        *self >= Self::EXCLUDE_FROM_CAPTURE
    }
}

/// Extended styles of the host window that depend on settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostWindowStyle {
    pub topmost: bool,
}

/// Callback run by the keyboard hook on key-down with the virtual-key code
///
/// Invoked on the thread that installed the hook, while it pumps messages.
pub type KeyDownCallback = Box<dyn Fn(u32)>;

pub trait Platform: DisplayTopology {
    /// Shared imaging factory handed out by the orchestrator
    type ImagingFactory: Clone;

    /// Enter the simulated exclusive-fullscreen state; released on drop
    fn begin_exclusive_fullscreen(&mut self) -> Option<Box<dyn Any>>;

    /// Register the host and flip suppression window classes once per process
    fn register_window_classes(&mut self);

    fn host_window_exists(&self) -> bool;

    /// Create the hidden host window; its messages are routed through `handlers`
    fn create_host_window(
        &mut self,
        rect: Rect,
        style: HostWindowStyle,
        handlers: Rc<HandlerChain>,
    ) -> RuntimeResult<WindowHandle>;

    /// Create the hidden, input-transparent flip suppression window
    fn create_flip_suppression_window(&mut self, rect: Rect) -> RuntimeResult<WindowHandle>;

    fn set_layered_alpha(&mut self, window: WindowHandle, alpha: u8) -> RuntimeResult<()>;

    fn exclude_from_capture(&mut self, window: WindowHandle) -> RuntimeResult<()>;

    fn show_window(&mut self, window: WindowHandle);

    /// Move `window` directly behind `anchor` without moving, sizing or redrawing it
    fn place_behind(&mut self, window: WindowHandle, anchor: WindowHandle) -> RuntimeResult<()>;

    fn destroy_window(&mut self, window: WindowHandle);

    fn os_version(&self) -> OsVersion;

    fn install_keyboard_hook(&mut self, on_key_down: KeyDownCallback) -> RuntimeResult<HookHandle>;

    fn uninstall_keyboard_hook(&mut self, hook: HookHandle);

    /// Retrieve and dispatch every queued message without blocking
    fn pump_messages(&mut self) -> PumpStatus;

    fn create_imaging_factory(&self) -> RuntimeResult<Self::ImagingFactory>;
}
