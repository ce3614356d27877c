//! Declarative effect chain handed to the effect renderer

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Scale factor of one effect stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub enum StageScale {
    /// Scale to fill the output; written as `[-1, -1]`
    Fit,
    Factor { x: f32, y: f32 },
}

impl From<[f32; 2]> for StageScale {
    fn from(value: [f32; 2]) -> Self {
        if value == [-1.0, -1.0] {
            StageScale::Fit
        } else {
            StageScale::Factor {
                x: value[0],
                y: value[1],
            }
        }
    }
}

impl From<StageScale> for [f32; 2] {
    fn from(value: StageScale) -> Self {
        match value {
            StageScale::Fit => [-1.0, -1.0],
            StageScale::Factor { x, y } => [x, y],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStage {
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<StageScale>,
}

impl EffectStage {
    pub fn new(effect: impl Into<String>) -> Self {
        Self {
            effect: effect.into(),
            scale: None,
        }
    }

    pub fn with_scale(mut self, scale: StageScale) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// Ordered effect stages; the first consumes the captured frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectChain {
    pub stages: Vec<EffectStage>,
}

impl EffectChain {
    /// FSR: EASU upscale to fit the output, then RCAS sharpening
    pub fn fsr() -> Self {
        Self {
            stages: vec![
                EffectStage::new("FSR_EASU").with_scale(StageScale::Fit),
                EffectStage::new("FSR_RCAS"),
            ],
        }
    }

    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        serde_json::from_str(json).map_err(|e| RuntimeError::InvalidSettings(e.to_string()))
    }

    pub fn to_json(&self) -> RuntimeResult<String> {
        serde_json::to_string(self).map_err(|e| RuntimeError::InvalidSettings(e.to_string()))
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::fsr()
    }
}
