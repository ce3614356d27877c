//! Collaborators that produce a frame
//!
//! The render loop and the print-screen keyboard hook both draw through one
//! [`RenderPipeline`]. Both run on the UI thread; the hook reaches the
//! pipeline through a [`Weak`] handle so a late key press after teardown
//! renders nothing.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::config::Settings;
use crate::subsystems::{CursorOverlay, DeviceContext, EffectRenderer, FrameContext, FrameSource};

#[derive(Default)]
pub(crate) struct RenderPipeline {
    pub device: Option<Box<dyn DeviceContext>>,
    pub frame_source: Option<Box<dyn FrameSource>>,
    pub renderer: Option<Box<dyn EffectRenderer>>,
    pub cursor: Option<Box<dyn CursorOverlay>>,
    pub settings: Option<Arc<Settings>>,
}

pub(crate) type SharedPipeline = Rc<RefCell<RenderPipeline>>;

impl RenderPipeline {
    /// Present one frame; returns `false` until every collaborator exists
    pub fn render(&mut self, cursor_capture: bool) -> bool {
        let (Some(renderer), Some(device), Some(frame_source), Some(settings)) = (
            self.renderer.as_deref_mut(),
            self.device.as_deref_mut(),
            self.frame_source.as_deref_mut(),
            self.settings.as_deref(),
        ) else {
            return false;
        };
        let cursor: Option<&mut dyn CursorOverlay> = match self.cursor.as_mut() {
            Some(cursor) => {
                let cursor: &mut dyn CursorOverlay = &mut **cursor;
                Some(cursor)
            }
            None => None,
        };

        renderer.render(
            FrameContext {
                device,
                frame_source,
                cursor,
                settings,
            },
            cursor_capture,
        );
        true
    }

    /// Drop the collaborators in reverse creation order
    pub fn release(&mut self) {
        self.cursor = None;
        self.renderer = None;
        self.frame_source = None;
        self.device = None;
        self.settings = None;
    }
}

/// Render a cursor capture pass from inside the keyboard hook
///
/// Returns `false` when the pipeline is gone or already borrowed by the
/// loop; the pending capture pass is then rendered by the next frame.
pub(crate) fn render_capture_pass(pipeline: &Weak<RefCell<RenderPipeline>>) -> bool {
    let Some(pipeline) = pipeline.upgrade() else {
        return false;
    };
    let Ok(mut pipeline) = pipeline.try_borrow_mut() else {
        return false;
    };
    pipeline.render(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pipeline_does_not_render() {
        let pipeline: SharedPipeline = Rc::default();
        assert!(!pipeline.borrow_mut().render(false));
        assert!(!render_capture_pass(&Rc::downgrade(&pipeline)));
    }

    #[test]
    fn test_capture_pass_skipped_while_borrowed_or_dropped() {
        let pipeline: SharedPipeline = Rc::default();
        let weak = Rc::downgrade(&pipeline);
        {
            let _loop_borrow = pipeline.borrow_mut();
            assert!(!render_capture_pass(&weak));
        }
        drop(pipeline);
        assert!(!render_capture_pass(&weak));
    }
}
