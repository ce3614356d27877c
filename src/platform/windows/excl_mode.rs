//! Simulated exclusive fullscreen
//!
//! The shell reports `QUNS_RUNNING_D3D_FULL_SCREEN` while the DirectDraw
//! exclusive-mode mutex is held, which suppresses notifications and toasts
//! over the magnified window.

use tracing::info;
use windows::core::w;
use windows::Win32::Foundation::{CloseHandle, FALSE, HANDLE, TRUE};
use windows::Win32::System::Threading::{
    CreateMutexW, OpenEventW, ReleaseMutex, SetEvent, EVENT_MODIFY_STATE,
};

use crate::logging;

pub(super) struct ExclusiveModeGuard {
    mutex: HANDLE,
}

impl ExclusiveModeGuard {
    pub(super) fn acquire() -> Option<Self> {
        let mutex = match unsafe { CreateMutexW(None, TRUE, w!("__DDrawExclMode__")) } {
            Ok(mutex) => mutex,
            Err(_) => {
                logging::win32_error("Failed to create exclusive mode mutex");
                return None;
            }
        };

        notify_shell();
        info!("Simulating exclusive fullscreen");
        Some(Self { mutex })
    }
}

/// Ask the shell to re-check the exclusive-mode state, if it is listening
fn notify_shell() {
    unsafe {
        if let Ok(event) = OpenEventW(EVENT_MODIFY_STATE, FALSE, w!("__DDrawCheckExclMode__")) {
            let _ = SetEvent(event);
            let _ = CloseHandle(event);
        }
    }
}

impl Drop for ExclusiveModeGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseMutex(self.mutex);
            let _ = CloseHandle(self.mutex);
        }
        notify_shell();
        info!("Exclusive fullscreen simulation ended");
    }
}
