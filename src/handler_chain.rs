//! Window message interceptors
//!
//! Collaborators register handlers instead of subclassing the host window.
//! Dispatch walks handlers newest-first; the first one returning `Some`
//! answers the message and older handlers never see it. Unanswered messages
//! get default processing (`WM_DESTROY` posts quit, the rest go to the
//! platform's default window procedure).
//!
//! The chain lives on the UI thread and is re-entrant: a handler may
//! register or unregister handlers, or trigger nested messages, while a
//! dispatch is in progress.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

pub const WM_DESTROY: u32 = 0x0002;

/// Raw window message as delivered to the window procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMessage {
    pub hwnd: isize,
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl WindowMessage {
    pub const fn new(hwnd: isize, msg: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            hwnd,
            msg,
            wparam,
            lparam,
        }
    }
}

/// Interceptor; `Some(result)` stops dispatch and is returned to the OS
pub type WndProcHandler = Rc<dyn Fn(&WindowMessage) -> Option<isize>>;

pub struct HandlerChain {
    handlers: RefCell<BTreeMap<u32, WndProcHandler>>,
    next_id: Cell<u32>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register a handler; ids start at 1 and are never reused until [`reset`](Self::reset)
    pub fn register<F>(&self, handler: F) -> u32
    where
        F: Fn(&WindowMessage) -> Option<isize> + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().insert(id, Rc::new(handler));
        id
    }

    /// Returns whether a handler with this id was registered
    pub fn unregister(&self, id: u32) -> bool {
        self.handlers.borrow_mut().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Drop every handler and restart ids at 1
    pub fn reset(&self) {
        self.handlers.borrow_mut().clear();
        self.next_id.set(1);
    }

    /// Offer the message to handlers, newest first
    pub fn dispatch(&self, message: &WindowMessage) -> Option<isize> {
        // Snapshot so handlers can mutate the registry while we iterate.
        let snapshot: Vec<WndProcHandler> = self.handlers.borrow().values().cloned().collect();
        snapshot
            .iter()
            .rev()
            .find_map(|handler| handler(message))
    }

    /// Full host window procedure: handlers, then default processing
    pub fn process<Q, D>(&self, message: &WindowMessage, post_quit: Q, default_proc: D) -> isize
    where
        Q: FnOnce(),
        D: FnOnce() -> isize,
    {
        if let Some(result) = self.dispatch(message) {
            return result;
        }

        match message.msg {
            WM_DESTROY => {
                post_quit();
                0
            }
            _ => default_proc(),
        }
    }
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::new()
    }
}
