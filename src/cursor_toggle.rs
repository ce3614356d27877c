//! Hide the cursor for print-screen captures
//!
//! On print-screen key-down the keyboard hook calls [`CursorToggle::on_key_down`]:
//! cursor drawing is switched off, a render pass flagged as a cursor capture
//! is requested, and the draw-cursor flag is restored after
//! [`CURSOR_RESTORE_DELAY`] from the UI dispatcher. The hook then renders
//! that pass before returning; the loop only picks the request up when the
//! hook could not reach the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::Settings;
use crate::delayed_task::{self, DelayedTask};
use crate::dispatcher::UiDispatcher;

/// Virtual-key code of the print-screen key
pub const VK_SNAPSHOT: u32 = 0x2C;

pub const CURSOR_RESTORE_DELAY: Duration = Duration::from_millis(400);

struct ToggleState {
    settings: Weak<Settings>,
    dispatcher: UiDispatcher,
    restore_delay: Duration,
    capture_pass: AtomicBool,
    pending: Mutex<Option<DelayedTask>>,
}

/// Shared between the keyboard hook and the render loop
#[derive(Clone)]
pub struct CursorToggle {
    state: Arc<ToggleState>,
}

impl CursorToggle {
    pub fn new(settings: &Arc<Settings>, dispatcher: UiDispatcher) -> Self {
        Self::with_restore_delay(settings, dispatcher, CURSOR_RESTORE_DELAY)
    }

    pub fn with_restore_delay(
        settings: &Arc<Settings>,
        dispatcher: UiDispatcher,
        restore_delay: Duration,
    ) -> Self {
        Self {
            state: Arc::new(ToggleState {
                settings: Arc::downgrade(settings),
                dispatcher,
                restore_delay,
                capture_pass: AtomicBool::new(false),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Hook entry point; returns whether the key started a capture
    pub fn on_key_down(&self, vk_code: u32) -> bool {
        vk_code == VK_SNAPSHOT && self.trigger()
    }

    /// Hide the cursor and schedule its restore
    ///
    /// No-op while cursor drawing is already off, so a pending restore is
    /// never stacked with a second one.
    pub fn trigger(&self) -> bool {
        let Some(settings) = self.state.settings.upgrade() else {
            return false;
        };
        if !settings.take_draw_cursor() {
            debug!("Cursor drawing already off, ignoring print screen");
            return false;
        }

        self.state.capture_pass.store(true, Ordering::Release);

        let restore = delayed_task::schedule(
            self.state.restore_delay,
            Arc::downgrade(&settings),
            self.state.dispatcher.clone(),
            |settings: &Settings| settings.set_draw_cursor(true),
        );
        *self.state.pending.lock() = Some(restore);

        info!(
            "Cursor hidden for screenshot, restoring in {}ms",
            self.state.restore_delay.as_millis()
        );
        true
    }

    /// Consume the pending cursor-capture render request
    pub fn take_capture_pass(&self) -> bool {
        self.state.capture_pass.swap(false, Ordering::AcqRel)
    }

    /// Cancel a scheduled restore, if any
    pub fn cancel_pending(&self) {
        if let Some(restore) = self.state.pending.lock().take() {
            restore.cancel();
        }
    }
}
