//! Scripted fakes for orchestrator tests
//!
//! `FakePlatform` and `FakeSubsystems` append to one shared event log so a
//! test can assert the global order of platform calls, collaborator
//! initialization and drops.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::effect_chain::EffectChain;
use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::{DisplayTopology, Rect};
use crate::handler_chain::{HandlerChain, WindowMessage, WM_DESTROY};
use crate::platform::{
    HookHandle, HostWindowStyle, KeyDownCallback, OsVersion, Platform, PumpStatus, SourceWindow,
    WindowHandle,
};
use crate::subsystems::{
    CursorOverlay, DeviceContext, EffectRenderer, FrameContext, FrameSource, FrameSourceKind,
    FrameTimer, Subsystems,
};

pub(crate) type EventLog = Rc<RefCell<Vec<String>>>;

pub(crate) fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn position(log: &EventLog, event: &str) -> Option<usize> {
    log.borrow().iter().position(|e| e == event)
}

pub(crate) fn count(log: &EventLog, prefix: &str) -> usize {
    log.borrow().iter().filter(|e| e.starts_with(prefix)).count()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let output = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    (result, output)
}

/// Pumps after which an unscripted run closes its host window
const MAX_PUMPS: usize = 64;

pub(crate) type ScriptStep = Box<dyn FnOnce(&mut FakePlatform)>;

struct FakeWindow {
    name: &'static str,
    handlers: Option<Rc<HandlerChain>>,
}

struct ExclusiveModeGuard(EventLog);

impl Drop for ExclusiveModeGuard {
    fn drop(&mut self) {
        self.0.borrow_mut().push("exclusive_mode:end".into());
    }
}

pub(crate) struct FakePlatform {
    pub log: EventLog,
    pub monitors: Vec<Rect>,
    pub source_frame: Rect,
    pub host_exists: bool,
    pub fail_flip_suppression: bool,
    pub fail_imaging_factory: bool,
    pub os: OsVersion,
    pub script: VecDeque<ScriptStep>,
    pub factories_created: Cell<usize>,
    pub pumps: usize,
    windows: HashMap<isize, FakeWindow>,
    next_handle: isize,
    quit_posted: Rc<Cell<bool>>,
    hook: Option<KeyDownCallback>,
}

impl FakePlatform {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: Rc::clone(log),
            monitors: vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 4480, 1440)],
            source_frame: Rect::new(100, 100, 900, 700),
            host_exists: false,
            fail_flip_suppression: false,
            fail_imaging_factory: false,
            os: OsVersion::new(10, 0, 22631),
            script: VecDeque::new(),
            factories_created: Cell::new(0),
            pumps: 0,
            windows: HashMap::new(),
            next_handle: 0x100,
            quit_posted: Rc::new(Cell::new(false)),
            hook: None,
        }
    }

    pub fn then(&mut self, step: impl FnOnce(&mut FakePlatform) + 'static) -> &mut Self {
        self.script.push_back(Box::new(step));
        self
    }

    /// Pump once without doing anything
    pub fn idle(&mut self, pumps: usize) -> &mut Self {
        for _ in 0..pumps {
            self.then(|_| {});
        }
        self
    }

    fn push(&self, event: impl Into<String>) {
        self.log.borrow_mut().push(event.into());
    }

    fn name_of(&self, window: WindowHandle) -> &'static str {
        self.windows
            .get(&window.raw())
            .map(|w| w.name)
            .unwrap_or("unknown")
    }

    fn host(&self) -> Option<WindowHandle> {
        self.windows
            .iter()
            .find(|(_, w)| w.name == "host")
            .map(|(raw, _)| WindowHandle::from_raw(*raw))
    }

    pub fn press_key(&mut self, vk_code: u32) {
        self.push(format!("key:{:#x}", vk_code));
        if let Some(hook) = self.hook.as_ref() {
            hook(vk_code);
        }
    }

    /// Deliver a message to the host window procedure
    pub fn send_to_host(&mut self, msg: u32) -> Option<isize> {
        let host = self.host()?;
        let handlers = self.windows.get(&host.raw())?.handlers.clone()?;
        let quit = Rc::clone(&self.quit_posted);
        let message = WindowMessage::new(host.raw(), msg, 0, 0);
        Some(handlers.process(&message, || quit.set(true), || 0))
    }

    /// User closes the host window
    pub fn close_host(&mut self) {
        if let Some(host) = self.host() {
            self.destroy_window(host);
        }
    }
}

impl DisplayTopology for FakePlatform {
    fn nearest_monitor_rect(&self, _source: SourceWindow) -> RuntimeResult<Rect> {
        self.monitors
            .iter()
            .copied()
            .find(|m| m.overlaps(&self.source_frame))
            .ok_or(RuntimeError::MonitorUnavailable)
    }

    fn window_frame_rect(&self, _source: SourceWindow) -> RuntimeResult<Rect> {
        Ok(self.source_frame)
    }

    fn monitor_rects(&self) -> RuntimeResult<Vec<Rect>> {
        Ok(self.monitors.clone())
    }

    fn virtual_screen_rect(&self) -> Rect {
        self.monitors
            .iter()
            .fold(Rect::default(), |acc, m| acc.union(m))
    }
}

impl Platform for FakePlatform {
    type ImagingFactory = Rc<String>;

    fn begin_exclusive_fullscreen(&mut self) -> Option<Box<dyn Any>> {
        self.push("exclusive_mode:begin");
        Some(Box::new(ExclusiveModeGuard(Rc::clone(&self.log))))
    }

    fn register_window_classes(&mut self) {
        self.push("register_classes");
    }

    fn host_window_exists(&self) -> bool {
        self.host_exists || self.host().is_some()
    }

    fn create_host_window(
        &mut self,
        rect: Rect,
        style: HostWindowStyle,
        handlers: Rc<HandlerChain>,
    ) -> RuntimeResult<WindowHandle> {
        let handle = WindowHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.windows.insert(
            handle.raw(),
            FakeWindow {
                name: "host",
                handlers: Some(handlers),
            },
        );
        self.push(format!(
            "create:host:{}x{}@{},{}:topmost={}",
            rect.width(),
            rect.height(),
            rect.left,
            rect.top,
            style.topmost
        ));
        Ok(handle)
    }

    fn create_flip_suppression_window(&mut self, rect: Rect) -> RuntimeResult<WindowHandle> {
        if self.fail_flip_suppression {
            self.push("create:ddf:failed");
            return Err(RuntimeError::FlipSuppression("scripted failure".into()));
        }
        let handle = WindowHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.windows.insert(
            handle.raw(),
            FakeWindow {
                name: "ddf",
                handlers: None,
            },
        );
        self.push(format!("create:ddf:{}x{}", rect.width(), rect.height()));
        Ok(handle)
    }

    fn set_layered_alpha(&mut self, window: WindowHandle, alpha: u8) -> RuntimeResult<()> {
        self.push(format!("alpha:{}:{}", self.name_of(window), alpha));
        Ok(())
    }

    fn exclude_from_capture(&mut self, window: WindowHandle) -> RuntimeResult<()> {
        self.push(format!("exclude:{}", self.name_of(window)));
        Ok(())
    }

    fn show_window(&mut self, window: WindowHandle) {
        self.push(format!("show:{}", self.name_of(window)));
    }

    fn place_behind(&mut self, window: WindowHandle, anchor: WindowHandle) -> RuntimeResult<()> {
        self.push(format!(
            "place:{}:behind:{}",
            self.name_of(window),
            self.name_of(anchor)
        ));
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowHandle) {
        let Some(destroyed) = self.windows.remove(&window.raw()) else {
            return;
        };
        self.push(format!("destroy:{}", destroyed.name));
        if let Some(handlers) = destroyed.handlers {
            let quit = Rc::clone(&self.quit_posted);
            let message = WindowMessage::new(window.raw(), WM_DESTROY, 0, 0);
            handlers.process(&message, || quit.set(true), || 0);
        }
    }

    fn os_version(&self) -> OsVersion {
        self.os
    }

    fn install_keyboard_hook(&mut self, on_key_down: KeyDownCallback) -> RuntimeResult<HookHandle> {
        self.push("hook:install");
        self.hook = Some(on_key_down);
        Ok(HookHandle::from_raw(0x77))
    }

    fn uninstall_keyboard_hook(&mut self, _hook: HookHandle) {
        self.push("hook:uninstall");
        self.hook = None;
    }

    fn pump_messages(&mut self) -> PumpStatus {
        self.pumps += 1;
        if let Some(step) = self.script.pop_front() {
            step(self);
        } else if self.pumps > MAX_PUMPS {
            self.close_host();
            self.quit_posted.set(true);
        }

        if self.quit_posted.replace(false) {
            self.push("quit");
            return PumpStatus::Quit;
        }
        PumpStatus::Idle
    }

    fn create_imaging_factory(&self) -> RuntimeResult<Rc<String>> {
        if self.fail_imaging_factory {
            return Err(RuntimeError::Com {
                context: "CoCreateInstance".into(),
                hresult: 0x8004_0154,
            });
        }
        self.factories_created.set(self.factories_created.get() + 1);
        Ok(Rc::new("wic".to_string()))
    }
}

/// Step at which a fake collaborator refuses to initialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailAt {
    Device,
    FrameSource,
    Renderer,
    Cursor,
}

pub(crate) struct FakeSubsystems {
    pub log: EventLog,
    pub fail_at: Option<FailAt>,
    pub screen_capture: bool,
    pub frame_count: Rc<Cell<u64>>,
    pub ui_visible: Rc<Cell<bool>>,
    /// (cursor_capture, draw_cursor) per render call
    pub renders: Rc<RefCell<Vec<(bool, bool)>>>,
    pub effects: Rc<RefCell<Option<EffectChain>>>,
    pub kind: Rc<Cell<Option<FrameSourceKind>>>,
}

impl FakeSubsystems {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: Rc::clone(log),
            fail_at: None,
            screen_capture: false,
            frame_count: Rc::new(Cell::new(0)),
            ui_visible: Rc::new(Cell::new(false)),
            renders: Rc::new(RefCell::new(Vec::new())),
            effects: Rc::new(RefCell::new(None)),
            kind: Rc::new(Cell::new(None)),
        }
    }

    fn fails(&self, step: FailAt) -> bool {
        self.fail_at == Some(step)
    }
}

fn init_result(log: &EventLog, name: &str, fail: bool) -> Result<()> {
    if fail {
        log.borrow_mut().push(format!("init:{}:failed", name));
        return Err(anyhow!("{} refused to initialize", name));
    }
    log.borrow_mut().push(format!("init:{}", name));
    Ok(())
}

struct FakeDevice {
    log: EventLog,
    fail: bool,
}

impl DeviceContext for FakeDevice {
    fn initialize(&mut self) -> Result<()> {
        init_result(&self.log, "device", self.fail)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop:device".into());
    }
}

struct FakeFrameSource {
    log: EventLog,
    fail: bool,
    screen_capture: bool,
    name: &'static str,
}

impl FrameSource for FakeFrameSource {
    fn initialize(&mut self, _device: &mut dyn DeviceContext) -> Result<()> {
        init_result(&self.log, "frame_source", self.fail)
    }

    fn src_frame_rect(&self) -> Rect {
        Rect::new(100, 100, 900, 700)
    }

    fn is_screen_capture(&self) -> bool {
        self.screen_capture
    }

    fn name(&self) -> &str {
        self.name
    }
}

impl Drop for FakeFrameSource {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop:frame_source".into());
    }
}

struct FakeTimer(Rc<Cell<u64>>);

impl FrameTimer for FakeTimer {
    fn frame_count(&self) -> u64 {
        self.0.get()
    }
}

struct FakeRenderer {
    log: EventLog,
    fail: bool,
    timer: FakeTimer,
    ui_visible: Rc<Cell<bool>>,
    renders: Rc<RefCell<Vec<(bool, bool)>>>,
    effects: Rc<RefCell<Option<EffectChain>>>,
}

impl EffectRenderer for FakeRenderer {
    fn initialize(
        &mut self,
        effects: &EffectChain,
        _device: &mut dyn DeviceContext,
        _frame_source: &dyn FrameSource,
    ) -> Result<()> {
        *self.effects.borrow_mut() = Some(effects.clone());
        init_result(&self.log, "renderer", self.fail)
    }

    fn render(&mut self, frame: FrameContext<'_>, cursor_capture: bool) {
        let count = self.timer.0.get() + 1;
        self.timer.0.set(count);
        self.renders
            .borrow_mut()
            .push((cursor_capture, frame.settings.is_draw_cursor()));
        self.log.borrow_mut().push(format!("render:{}", count));
    }

    fn is_ui_visible(&self) -> bool {
        self.ui_visible.get()
    }

    fn set_ui_visible(&mut self, visible: bool) {
        self.log.borrow_mut().push(format!("ui_visible:{}", visible));
        self.ui_visible.set(visible);
    }

    fn frame_timer(&self) -> &dyn FrameTimer {
        &self.timer
    }
}

impl Drop for FakeRenderer {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop:renderer".into());
    }
}

struct FakeCursor {
    log: EventLog,
    fail: bool,
}

impl CursorOverlay for FakeCursor {
    fn initialize(&mut self, _device: &mut dyn DeviceContext) -> Result<()> {
        init_result(&self.log, "cursor", self.fail)
    }
}

impl Drop for FakeCursor {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop:cursor".into());
    }
}

impl Subsystems for FakeSubsystems {
    fn device_context(&mut self) -> Box<dyn DeviceContext> {
        Box::new(FakeDevice {
            log: Rc::clone(&self.log),
            fail: self.fails(FailAt::Device),
        })
    }

    fn frame_source(&mut self, kind: FrameSourceKind, _source: SourceWindow) -> Box<dyn FrameSource> {
        self.kind.set(Some(kind));
        Box::new(FakeFrameSource {
            log: Rc::clone(&self.log),
            fail: self.fails(FailAt::FrameSource),
            screen_capture: self.screen_capture,
            name: kind.as_str(),
        })
    }

    fn effect_renderer(&mut self) -> Box<dyn EffectRenderer> {
        Box::new(FakeRenderer {
            log: Rc::clone(&self.log),
            fail: self.fails(FailAt::Renderer),
            timer: FakeTimer(Rc::clone(&self.frame_count)),
            ui_visible: Rc::clone(&self.ui_visible),
            renders: Rc::clone(&self.renders),
            effects: Rc::clone(&self.effects),
        })
    }

    fn cursor_overlay(&mut self) -> Box<dyn CursorOverlay> {
        Box::new(FakeCursor {
            log: Rc::clone(&self.log),
            fail: self.fails(FailAt::Cursor),
        })
    }
}
