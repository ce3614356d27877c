//! Lazily created process-wide resource with an explicit teardown
//!
//! Used for the shared imaging factory: created on first request, handed
//! out by clone, recreated on a later request if creation failed, and
//! released when the owner calls [`SharedResource::release`].

use parking_lot::Mutex;

use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

pub struct SharedResource<T: Clone> {
    name: &'static str,
    slot: Mutex<Option<T>>,
}

impl<T: Clone> SharedResource<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    /// Return the resource, creating it first if needed
    ///
    /// A creation failure is logged and yields `None`; callers treat that as
    /// the feature being unavailable for this call.
    pub fn get_or_create<F>(&self, create: F) -> Option<T>
    where
        F: FnOnce() -> RuntimeResult<T>,
    {
        let mut slot = self.slot.lock();
        if let Some(resource) = slot.as_ref() {
            return Some(resource.clone());
        }

        match create() {
            Ok(resource) => {
                *slot = Some(resource.clone());
                Some(resource)
            }
            Err(err) => {
                match &err {
                    RuntimeError::Com { hresult, .. } => {
                        logging::com_error(&format!("Failed to create {}", self.name), *hresult)
                    }
                    _ => tracing::error!(error = %err, "Failed to create {}", self.name),
                }
                None
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop the cached resource; returns whether one existed
    pub fn release(&self) -> bool {
        self.slot.lock().take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_created_once() {
        let resource = SharedResource::new("counter");
        let calls = Cell::new(0);
        let create = || {
            calls.set(calls.get() + 1);
            Ok(7u32)
        };

        assert_eq!(resource.get_or_create(create), Some(7));
        assert_eq!(resource.get_or_create(|| Ok(8)), Some(7));
        assert_eq!(calls.get(), 1);
        assert!(resource.is_initialized());
    }

    #[test]
    fn test_failure_yields_none_and_retries() {
        let resource: SharedResource<u32> = SharedResource::new("factory");
        let failed = resource.get_or_create(|| {
            Err(RuntimeError::Com {
                context: "CoCreateInstance".into(),
                hresult: 0x8004_0154,
            })
        });
        assert_eq!(failed, None);
        assert!(!resource.is_initialized());
        assert_eq!(resource.get_or_create(|| Ok(3)), Some(3));
    }

    #[test]
    fn test_release_then_recreate() {
        let resource = SharedResource::new("factory");
        resource.get_or_create(|| Ok(String::from("first")));
        assert!(resource.release());
        assert!(!resource.release());
        assert_eq!(
            resource.get_or_create(|| Ok(String::from("second"))),
            Some("second".to_string())
        );
    }
}
