//! UI dispatch queue
//!
//! Work posted from other threads (the delayed cursor restore, hook
//! callbacks) is queued here and executed on the UI thread when the queue is
//! drained. The render loop drains it every iteration, next to the OS
//! message pump, and never blocks on it.

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::warn;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle to the UI thread's task queue
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiTask>,
    rx: Receiver<UiTask>,
}

impl UiDispatcher {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Queue a task for the UI thread; returns `false` if the queue is gone
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.tx.send(Box::new(task)) {
            warn!("UI dispatcher rejected task: {}", e);
            return false;
        }
        true
    }

    /// Run every task queued so far without waiting for more
    ///
    /// Returns the number of tasks executed.
    pub fn drain(&self) -> usize {
        let mut executed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        executed
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for UiDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_drain_runs_in_post_order() {
        let dispatcher = UiDispatcher::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            assert!(dispatcher.post(move || order.lock().push(i)));
        }
        assert_eq!(dispatcher.pending(), 3);
        assert_eq!(dispatcher.drain(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(dispatcher.drain(), 0);
    }

    #[test]
    fn test_post_from_other_thread() {
        let dispatcher = UiDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let remote = dispatcher.clone();
        let remote_hits = Arc::clone(&hits);
        std::thread::spawn(move || {
            remote.post(move || {
                remote_hits.fetch_add(1, Ordering::SeqCst);
            });
        })
        .join()
        .unwrap();

        // Nothing runs until the UI thread drains.
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        dispatcher.drain();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
