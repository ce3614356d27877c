//! Host and flip suppression window classes
//!
//! The host window routes every message through the run's [`HandlerChain`].
//! The chain lives in a thread-local slot for as long as the host exists;
//! the window procedure always runs on the thread that created the window.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use tracing::info;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, GRAY_BRUSH, HBRUSH};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, FindWindowW, LoadCursorW, PostQuitMessage, RegisterClassExW,
    HMENU, IDC_ARROW, WINDOW_EX_STYLE, WM_DESTROY, WM_NCDESTROY, WNDCLASSEXW, WS_EX_LAYERED,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::Rect;
use crate::handler_chain::{HandlerChain, WindowMessage};
use crate::logging;
use crate::platform::HostWindowStyle;

pub const HOST_WINDOW_CLASS_NAME: PCWSTR = w!("Window_MagRuntime_3B2C6F1E-8A4D-4E57-9C0B-71D5A2E86F43");
pub const DDF_WINDOW_CLASS_NAME: PCWSTR = w!("Window_MagRuntime_D7E1940A-5F2B-4C68-B3A9-0E4F8C17D25B");

static REGISTER_CLASSES: Once = Once::new();

thread_local! {
    static HOST_HANDLERS: RefCell<Option<Rc<HandlerChain>>> = RefCell::new(None);
}

pub(super) fn register_classes(instance: HINSTANCE) {
    REGISTER_CLASSES.call_once(|| unsafe {
        let mut class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(host_wnd_proc),
            hInstance: instance,
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            lpszClassName: HOST_WINDOW_CLASS_NAME,
            ..Default::default()
        };
        // A failure here usually means the class is already registered.
        if RegisterClassExW(&class) == 0 {
            logging::win32_error("Failed to register host window class");
        } else {
            info!("Host window class registered");
        }

        class.lpfnWndProc = Some(flip_suppression_wnd_proc);
        class.hbrBackground = HBRUSH(GetStockObject(GRAY_BRUSH).0);
        class.lpszClassName = DDF_WINDOW_CLASS_NAME;
        if RegisterClassExW(&class) == 0 {
            logging::win32_error("Failed to register flip suppression window class");
        } else {
            info!("Flip suppression window class registered");
        }
    });
}

pub(super) fn host_window_exists() -> bool {
    unsafe { FindWindowW(HOST_WINDOW_CLASS_NAME, PCWSTR::null()) }.0 != 0
}

pub(super) fn create_host_window(
    instance: HINSTANCE,
    rect: Rect,
    style: HostWindowStyle,
    handlers: Rc<HandlerChain>,
) -> RuntimeResult<HWND> {
    HOST_HANDLERS.with(|slot| *slot.borrow_mut() = Some(handlers));

    let topmost = if style.topmost {
        WS_EX_TOPMOST
    } else {
        WINDOW_EX_STYLE(0)
    };
    // No title, window pickers skip untitled windows.
    let hwnd = unsafe {
        CreateWindowExW(
            topmost | WS_EX_NOACTIVATE | WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW,
            HOST_WINDOW_CLASS_NAME,
            PCWSTR::null(),
            WS_POPUP,
            rect.left,
            rect.top,
            rect.width(),
            rect.height(),
            HWND::default(),
            HMENU::default(),
            instance,
            None,
        )
    };

    if hwnd.0 == 0 {
        let err = os_error();
        HOST_HANDLERS.with(|slot| slot.borrow_mut().take());
        return Err(RuntimeError::HostWindowCreation(err));
    }
    Ok(hwnd)
}

pub(super) fn create_flip_suppression_window(instance: HINSTANCE, rect: Rect) -> RuntimeResult<HWND> {
    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_NOACTIVATE | WS_EX_LAYERED | WS_EX_TRANSPARENT,
            DDF_WINDOW_CLASS_NAME,
            PCWSTR::null(),
            WS_POPUP,
            rect.left,
            rect.top,
            rect.width(),
            rect.height(),
            HWND::default(),
            HMENU::default(),
            instance,
            None,
        )
    };

    if hwnd.0 == 0 {
        return Err(RuntimeError::FlipSuppression(os_error()));
    }
    Ok(hwnd)
}

fn os_error() -> String {
    std::io::Error::last_os_error().to_string()
}

unsafe extern "system" fn host_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // Cloned so handlers may register, unregister or reset during dispatch.
    let handlers = HOST_HANDLERS.with(|slot| slot.borrow().clone());
    if msg == WM_NCDESTROY {
        HOST_HANDLERS.with(|slot| slot.borrow_mut().take());
    }

    let Some(handlers) = handlers else {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    };

    let message = WindowMessage::new(hwnd.0, msg, wparam.0, lparam.0);
    let result = handlers.process(
        &message,
        || PostQuitMessage(0),
        || DefWindowProcW(hwnd, msg, wparam, lparam).0,
    );
    LRESULT(result)
}

unsafe extern "system" fn flip_suppression_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // Never posts a quit message.
    if msg == WM_DESTROY {
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}
