//! Error types for the runtime core
//!
//! Every failure the orchestrator can hit while bringing a run up is a
//! [`RuntimeError`]. Collaborators (device, frame source, renderer, cursor)
//! report failures as `anyhow::Error`; the orchestrator wraps those into the
//! variant naming the step that failed.

use thiserror::Error;

/// Log level an error is reported at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Critical,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("a run is already active")]
    RunActive,

    #[error("a host window already exists")]
    HostWindowExists,

    #[error("failed to create host window: {0}")]
    HostWindowCreation(String),

    #[error("failed to calculate host window rect: {0}")]
    HostRect(String),

    #[error("no monitor could be resolved for the source window")]
    MonitorUnavailable,

    #[error("host window rect is degenerate ({width}x{height})")]
    DegenerateHostRect { width: i32, height: i32 },

    #[error("unknown capture mode")]
    UnknownCaptureMode,

    #[error("failed to initialize device context: {0:#}")]
    DeviceContext(anyhow::Error),

    #[error("failed to initialize frame source: {0:#}")]
    FrameSource(anyhow::Error),

    #[error("failed to initialize effect renderer: {0:#}")]
    EffectRenderer(anyhow::Error),

    #[error("failed to initialize cursor overlay: {0:#}")]
    CursorOverlay(anyhow::Error),

    #[error("failed to create flip suppression window: {0}")]
    FlipSuppression(String),

    #[error("failed to install keyboard hook: {0}")]
    KeyboardHook(String),

    #[error("{context}: {message}")]
    Platform { context: String, message: String },

    #[error("{context} (hresult {hresult:#010x})")]
    Com { context: String, hresult: u32 },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl RuntimeError {
    pub fn platform(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Platform {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Level the orchestrator logs this failure at
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownCaptureMode
            | Self::FrameSource(_)
            | Self::EffectRenderer(_)
            | Self::CursorOverlay(_) => Severity::Critical,
            _ => Severity::Error,
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
