//! Win32 implementation of [`Platform`]

mod excl_mode;
mod imaging;
mod keyboard_hook;
mod monitor;
mod window;

use std::any::Any;
use std::mem;
use std::rc::Rc;

use tracing::{error, info, warn};
use windows::Wdk::System::SystemServices::RtlGetVersion;
use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND};
use windows::Win32::Graphics::Imaging::IWICImagingFactory2;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::SystemInformation::OSVERSIONINFOW;
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyWindow, DispatchMessageW, PeekMessageW, SetLayeredWindowAttributes,
    SetWindowDisplayAffinity, SetWindowPos, ShowWindow, TranslateMessage, LWA_ALPHA, MSG,
    PM_REMOVE, SWP_NOMOVE, SWP_NOREDRAW, SWP_NOSIZE, SW_NORMAL, WDA_EXCLUDEFROMCAPTURE, WM_QUIT,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::{DisplayTopology, Rect};
use crate::handler_chain::HandlerChain;

use super::{
    HookHandle, HostWindowStyle, KeyDownCallback, OsVersion, Platform, PumpStatus, SourceWindow,
    WindowHandle,
};

pub use window::{DDF_WINDOW_CLASS_NAME, HOST_WINDOW_CLASS_NAME};

/// Wrap a failed Win32 call; the caller decides how to report it
fn win32_failure(context: &str, err: windows::core::Error) -> RuntimeError {
    RuntimeError::platform(context, err.to_string())
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.raw())
}

pub struct Win32Platform {
    instance: HINSTANCE,
    os_version: OsVersion,
}

impl Win32Platform {
    pub fn new() -> RuntimeResult<Self> {
        let module =
            unsafe { GetModuleHandleW(None) }.map_err(|e| win32_failure("GetModuleHandleW", e))?;
        let os_version = query_os_version();
        info!(
            "OS version: {}.{}.{}",
            os_version.major, os_version.minor, os_version.build
        );

        Ok(Self {
            instance: HINSTANCE(module.0),
            os_version,
        })
    }
}

fn query_os_version() -> OsVersion {
    let mut info = OSVERSIONINFOW {
        dwOSVersionInfoSize: mem::size_of::<OSVERSIONINFOW>() as u32,
        ..Default::default()
    };
    let status = unsafe { RtlGetVersion(&mut info) };
    if status.is_err() {
        warn!("RtlGetVersion failed: {:#010x}", status.0);
        return OsVersion::new(0, 0, 0);
    }
    OsVersion::new(info.dwMajorVersion, info.dwMinorVersion, info.dwBuildNumber)
}

impl DisplayTopology for Win32Platform {
    fn nearest_monitor_rect(&self, source: SourceWindow) -> RuntimeResult<Rect> {
        monitor::nearest_monitor_rect(HWND(source.raw()))
    }

    fn window_frame_rect(&self, source: SourceWindow) -> RuntimeResult<Rect> {
        monitor::window_frame_rect(HWND(source.raw()))
    }

    fn monitor_rects(&self) -> RuntimeResult<Vec<Rect>> {
        monitor::monitor_rects()
    }

    fn virtual_screen_rect(&self) -> Rect {
        monitor::virtual_screen_rect()
    }
}

impl Platform for Win32Platform {
    type ImagingFactory = IWICImagingFactory2;

    fn begin_exclusive_fullscreen(&mut self) -> Option<Box<dyn Any>> {
        excl_mode::ExclusiveModeGuard::acquire().map(|guard| Box::new(guard) as Box<dyn Any>)
    }

    fn register_window_classes(&mut self) {
        window::register_classes(self.instance);
    }

    fn host_window_exists(&self) -> bool {
        window::host_window_exists()
    }

    fn create_host_window(
        &mut self,
        rect: Rect,
        style: HostWindowStyle,
        handlers: Rc<HandlerChain>,
    ) -> RuntimeResult<WindowHandle> {
        window::create_host_window(self.instance, rect, style, handlers)
            .map(|hwnd| WindowHandle::from_raw(hwnd.0))
    }

    fn create_flip_suppression_window(&mut self, rect: Rect) -> RuntimeResult<WindowHandle> {
        window::create_flip_suppression_window(self.instance, rect)
            .map(|hwnd| WindowHandle::from_raw(hwnd.0))
    }

    fn set_layered_alpha(&mut self, window: WindowHandle, alpha: u8) -> RuntimeResult<()> {
        unsafe { SetLayeredWindowAttributes(hwnd(window), COLORREF(0), alpha, LWA_ALPHA) }
            .map_err(|e| win32_failure("SetLayeredWindowAttributes", e))
    }

    fn exclude_from_capture(&mut self, window: WindowHandle) -> RuntimeResult<()> {
        unsafe { SetWindowDisplayAffinity(hwnd(window), WDA_EXCLUDEFROMCAPTURE) }
            .map_err(|e| win32_failure("SetWindowDisplayAffinity", e))
    }

    fn show_window(&mut self, window: WindowHandle) {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_NORMAL);
        }
    }

    fn place_behind(&mut self, window: WindowHandle, anchor: WindowHandle) -> RuntimeResult<()> {
        unsafe {
            SetWindowPos(
                hwnd(window),
                hwnd(anchor),
                0,
                0,
                0,
                0,
                SWP_NOSIZE | SWP_NOMOVE | SWP_NOREDRAW,
            )
        }
        .map_err(|e| win32_failure("SetWindowPos", e))
    }

    fn destroy_window(&mut self, window: WindowHandle) {
        if let Err(err) = unsafe { DestroyWindow(hwnd(window)) } {
            error!(error = %err, "DestroyWindow failed");
        }
    }

    fn os_version(&self) -> OsVersion {
        self.os_version
    }

    fn install_keyboard_hook(&mut self, on_key_down: KeyDownCallback) -> RuntimeResult<HookHandle> {
        keyboard_hook::install_keyboard_hook(on_key_down)
    }

    fn uninstall_keyboard_hook(&mut self, hook: HookHandle) {
        keyboard_hook::uninstall_keyboard_hook(hook);
    }

    fn pump_messages(&mut self) -> PumpStatus {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    return PumpStatus::Quit;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        PumpStatus::Idle
    }

    fn create_imaging_factory(&self) -> RuntimeResult<IWICImagingFactory2> {
        imaging::create_imaging_factory()
    }
}
