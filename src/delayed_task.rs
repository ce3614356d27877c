//! Cancellable delayed continuation holding a weak handle
//!
//! A timer thread waits out the delay, then posts the action to the UI
//! dispatcher. The action only runs if the weak handle still upgrades when
//! the UI thread gets to it, so a continuation outliving its target is
//! skipped instead of touching released state. The returned
//! [`DelayedTask`] can also cancel the continuation outright.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use tracing::debug;

use crate::dispatcher::UiDispatcher;

/// Handle to a scheduled continuation
pub struct DelayedTask {
    cancel_tx: Sender<()>,
    cancelled: Arc<AtomicBool>,
}

impl DelayedTask {
    /// Cancel the continuation; harmless if it already ran
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let _ = self.cancel_tx.try_send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Run `action` on the UI thread after `delay`, if `target` is still alive
pub fn schedule<T, F>(
    delay: Duration,
    target: Weak<T>,
    dispatcher: UiDispatcher,
    action: F,
) -> DelayedTask
where
    T: Send + Sync + 'static,
    F: FnOnce(&T) + Send + 'static,
{
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    let cancelled = Arc::new(AtomicBool::new(false));
    let task_cancelled = Arc::clone(&cancelled);

    thread::spawn(move || {
        let deadline = Instant::now() + delay;
        match cancel_rx.recv_timeout(delay) {
            Ok(()) => {
                debug!("Delayed task cancelled before firing");
                return;
            }
            // Handle dropped: nothing can cancel anymore, fire as scheduled.
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(deadline.saturating_duration_since(Instant::now()))
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        dispatcher.post(move || {
            if task_cancelled.load(Ordering::Acquire) {
                debug!("Delayed task cancelled before running");
                return;
            }
            match target.upgrade() {
                Some(target) => action(&target),
                None => debug!("Delayed task target released, skipping"),
            }
        });
    });

    DelayedTask {
        cancel_tx,
        cancelled,
    }
}
