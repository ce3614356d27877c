//! Low-level keyboard hook
//!
//! Only key-down events reach the callback. The hook procedure runs on the
//! installing thread while it pumps messages and always chains to the next
//! hook, so input is never swallowed.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WM_KEYDOWN,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::platform::{HookHandle, KeyDownCallback};

thread_local! {
    /// Callback of the hook installed by this thread
    static KEY_DOWN_CALLBACK: RefCell<Option<Rc<KeyDownCallback>>> = RefCell::new(None);
}

fn set_callback(callback: Option<KeyDownCallback>) {
    KEY_DOWN_CALLBACK.with(|slot| *slot.borrow_mut() = callback.map(Rc::new));
}

pub(super) fn install_keyboard_hook(on_key_down: KeyDownCallback) -> RuntimeResult<HookHandle> {
    set_callback(Some(on_key_down));

    let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) };
    match hook {
        Ok(hook) => {
            debug!("Keyboard hook installed");
            Ok(HookHandle::from_raw(hook.0))
        }
        Err(err) => {
            set_callback(None);
            Err(RuntimeError::KeyboardHook(err.to_string()))
        }
    }
}

pub(super) fn uninstall_keyboard_hook(hook: HookHandle) {
    unsafe {
        let _ = UnhookWindowsHookEx(HHOOK(hook.raw()));
    }
    set_callback(None);
    debug!("Keyboard hook uninstalled");
}

unsafe extern "system" fn keyboard_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code == HC_ACTION as i32 && w_param.0 as u32 == WM_KEYDOWN {
        let info = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        // Cloned out of the slot so the callback may pump or uninstall.
        let callback = KEY_DOWN_CALLBACK.with(|slot| slot.borrow().clone());
        if let Some(on_key_down) = callback {
            (**on_key_down)(info.vkCode);
        }
    }

    CallNextHookEx(None, n_code, w_param, l_param)
}
