//! Collaborators the orchestrator sequences
//!
//! GPU device, capture backends, effect renderer and cursor compositing are
//! implemented outside this crate. The orchestrator only needs the contracts
//! below plus a [`Subsystems`] factory that builds one instance of each per
//! run. Instances are owned by the orchestrator and dropped in reverse
//! acquisition order when the run ends.

use anyhow::Result;

use crate::config::{CaptureMode, Settings};
use crate::effect_chain::EffectChain;
use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::Rect;
use crate::platform::SourceWindow;

/// GPU device and swap-chain-capable resources
pub trait DeviceContext {
    fn initialize(&mut self) -> Result<()>;
}

/// Capture backend producing the source window's pixels every frame
pub trait FrameSource {
    fn initialize(&mut self, device: &mut dyn DeviceContext) -> Result<()>;

    /// Captured area of the source window
    fn src_frame_rect(&self) -> Rect;

    /// Whether the backend captures the screen rather than the window itself
    fn is_screen_capture(&self) -> bool;

    fn name(&self) -> &str;
}

/// Composites the system cursor into the rendered output
pub trait CursorOverlay {
    fn initialize(&mut self, device: &mut dyn DeviceContext) -> Result<()>;
}

/// Monotonic count of rendered frames
pub trait FrameTimer {
    fn frame_count(&self) -> u64;
}

/// Everything one render pass may touch
pub struct FrameContext<'a> {
    pub device: &'a mut dyn DeviceContext,
    pub frame_source: &'a mut dyn FrameSource,
    pub cursor: Option<&'a mut dyn CursorOverlay>,
    pub settings: &'a Settings,
}

/// Runs the effect chain over captured frames
pub trait EffectRenderer {
    fn initialize(
        &mut self,
        effects: &EffectChain,
        device: &mut dyn DeviceContext,
        frame_source: &dyn FrameSource,
    ) -> Result<()>;

    /// Render one frame; `cursor_capture` asks for a pass without the cursor
    fn render(&mut self, frame: FrameContext<'_>, cursor_capture: bool);

    fn is_ui_visible(&self) -> bool;

    fn set_ui_visible(&mut self, visible: bool);

    fn frame_timer(&self) -> &dyn FrameTimer;
}

/// Capture backend implementations, one per supported capture mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSourceKind {
    GraphicsCapture,
    DesktopDuplication,
    Gdi,
    DwmSharedSurface,
}

impl FrameSourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GraphicsCapture => "Graphics Capture",
            Self::DesktopDuplication => "Desktop Duplication",
            Self::Gdi => "GDI",
            Self::DwmSharedSurface => "DwmSharedSurface",
        }
    }
}

/// Pick the backend for a capture mode; there is no fallback between backends
pub fn select_frame_source(mode: CaptureMode) -> RuntimeResult<FrameSourceKind> {
    match mode {
        CaptureMode::GraphicsCapture => Ok(FrameSourceKind::GraphicsCapture),
        CaptureMode::DesktopDuplication => Ok(FrameSourceKind::DesktopDuplication),
        CaptureMode::Gdi => Ok(FrameSourceKind::Gdi),
        CaptureMode::DwmSharedSurface => Ok(FrameSourceKind::DwmSharedSurface),
        CaptureMode::Unsupported => Err(RuntimeError::UnknownCaptureMode),
    }
}

/// Builds the collaborators of one run
pub trait Subsystems {
    fn device_context(&mut self) -> Box<dyn DeviceContext>;

    fn frame_source(&mut self, kind: FrameSourceKind, source: SourceWindow) -> Box<dyn FrameSource>;

    fn effect_renderer(&mut self) -> Box<dyn EffectRenderer>;

    fn cursor_overlay(&mut self) -> Box<dyn CursorOverlay>;
}
