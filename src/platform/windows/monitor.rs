use std::ffi::c_void;
use std::mem;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_EXTENDED_FRAME_BOUNDS};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, MonitorFromWindow, HDC, HMONITOR, MONITORINFO,
    MONITOR_DEFAULTTONEAREST,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, GetWindowRect, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::Rect;

fn rect_error(context: &str) -> RuntimeError {
    let os_error = std::io::Error::last_os_error();
    RuntimeError::HostRect(format!("{}: {}", context, os_error))
}

fn to_rect(rect: RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

/// Full area of the monitor closest to `hwnd`
pub(super) fn nearest_monitor_rect(hwnd: HWND) -> RuntimeResult<Rect> {
    let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
    if monitor.0 == 0 {
        return Err(RuntimeError::MonitorUnavailable);
    }

    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return Err(rect_error("GetMonitorInfoW"));
    }
    Ok(to_rect(info.rcMonitor))
}

/// Visible frame of `hwnd`, without the invisible resize borders when DWM knows them
pub(super) fn window_frame_rect(hwnd: HWND) -> RuntimeResult<Rect> {
    let mut rect = RECT::default();
    let dwm = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS,
            &mut rect as *mut RECT as *mut c_void,
            mem::size_of::<RECT>() as u32,
        )
    };
    if dwm.is_err() && unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
        return Err(rect_error("GetWindowRect"));
    }
    Ok(to_rect(rect))
}

pub(super) fn monitor_rects() -> RuntimeResult<Vec<Rect>> {
    unsafe extern "system" fn monitor_enum_proc(
        _hmonitor: HMONITOR,
        _hdc: HDC,
        monitor_rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        let rects = unsafe { &mut *(lparam.0 as *mut Vec<Rect>) };
        if let Some(rect) = unsafe { monitor_rect.as_ref() } {
            rects.push(to_rect(*rect));
        }
        TRUE
    }

    let mut rects: Vec<Rect> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(monitor_enum_proc),
            LPARAM(std::ptr::addr_of_mut!(rects) as isize),
        )
    };
    if !ok.as_bool() {
        return Err(rect_error("EnumDisplayMonitors"));
    }
    Ok(rects)
}

pub(super) fn virtual_screen_rect() -> Rect {
    unsafe {
        Rect::from_origin_size(
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    }
}
