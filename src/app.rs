//! Magnification runtime orchestrator
//!
//! [`MagApp`] owns one magnification run at a time. It:
//! - creates the host window and, optionally, the flip suppression window
//! - builds the collaborators (device, frame source, effect renderer, cursor)
//! - installs the print-screen keyboard hook
//! - drives the message/render loop until the host window is destroyed
//! - tears everything down in reverse acquisition order
//!
//! Initialization failures after the host window exists do not return early:
//! the host is destroyed and the loop drains the resulting quit message, so
//! teardown always runs through the same path.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::cursor_toggle::CursorToggle;
use crate::dispatcher::UiDispatcher;
use crate::effect_chain::EffectChain;
use crate::error::{RuntimeError, RuntimeResult};
use crate::geometry::{self, Rect};
use crate::handler_chain::{HandlerChain, WindowMessage};
use crate::logging;
use crate::pipeline::{self, RenderPipeline, SharedPipeline};
use crate::platform::{HookHandle, HostWindowStyle, Platform, PumpStatus, SourceWindow, WindowHandle};
use crate::shared_resource::SharedResource;
use crate::subsystems::{self, Subsystems};

/// Frame count from which the flip suppression window is shown
const FLIP_SUPPRESSION_REVEAL_FRAME: u64 = 2;

/// Host alpha when DirectFlip must be suppressed; 255 lets DWM flip the swap chain
const HOST_ALPHA_NO_FLIP: u8 = 254;
const OPAQUE_ALPHA: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Running,
    Quitting,
}

/// How a call to [`MagApp::run`] ended
///
/// `run` only returns once the message loop has ended, whatever the outcome.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step initialized and the loop ran until the host was destroyed
    Completed,
    /// A step failed; the run was torn down without rendering
    Failed(RuntimeError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    pub fn error(&self) -> Option<&RuntimeError> {
        match self {
            RunOutcome::Completed => None,
            RunOutcome::Failed(err) => Some(err),
        }
    }

    /// Always true; kept for callers that only want to know the loop is gone
    pub fn loop_ended(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct ControlFlags {
    stop: AtomicBool,
    toggle_overlay: AtomicBool,
}

/// Thread-safe handle for requests serviced at the top of the loop
#[derive(Clone, Default)]
pub struct RunControl {
    flags: Arc<ControlFlags>,
}

impl RunControl {
    /// Ask the running loop to destroy its windows and end the run
    pub fn request_stop(&self) {
        self.flags.stop.store(true, Ordering::Release);
    }

    /// Ask the running loop to flip the renderer's overlay UI visibility
    pub fn request_toggle_overlay(&self) {
        self.flags.toggle_overlay.store(true, Ordering::Release);
    }

    fn take_stop(&self) -> bool {
        self.flags.stop.swap(false, Ordering::AcqRel)
    }

    fn take_toggle_overlay(&self) -> bool {
        self.flags.toggle_overlay.swap(false, Ordering::AcqRel)
    }

    fn clear(&self) {
        self.flags.stop.store(false, Ordering::Release);
        self.flags.toggle_overlay.store(false, Ordering::Release);
    }
}

pub struct MagApp<P: Platform> {
    platform: P,
    handlers: Rc<HandlerChain>,
    control: RunControl,
    imaging_factory: SharedResource<P::ImagingFactory>,
    state: RunState,

    source: Option<SourceWindow>,
    settings: Option<Arc<Settings>>,
    dispatcher: Option<UiDispatcher>,
    host_rect: Rect,
    host_wnd: Option<WindowHandle>,
    ddf_wnd: Option<WindowHandle>,
    ddf_revealed: bool,

    pipeline: SharedPipeline,

    keyboard_hook: Option<HookHandle>,
    cursor_toggle: Option<CursorToggle>,
}

impl<P: Platform> MagApp<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            handlers: Rc::new(HandlerChain::new()),
            control: RunControl::default(),
            imaging_factory: SharedResource::new("imaging factory"),
            state: RunState::Idle,
            source: None,
            settings: None,
            dispatcher: None,
            host_rect: Rect::default(),
            host_wnd: None,
            ddf_wnd: None,
            ddf_revealed: false,
            pipeline: Rc::new(RefCell::new(RenderPipeline::default())),
            keyboard_hook: None,
            cursor_toggle: None,
        }
    }

    /// Magnify `source` until the host window is destroyed
    ///
    /// Blocks in the message loop. Returns [`RunOutcome::Failed`] with the
    /// first error when a step could not be initialized.
    pub fn run(
        &mut self,
        source: SourceWindow,
        settings: Arc<Settings>,
        dispatcher: UiDispatcher,
        subsystems: &mut dyn Subsystems,
    ) -> RunOutcome {
        if self.state != RunState::Idle {
            warn!("Run requested while a run is active");
            return RunOutcome::Failed(RuntimeError::RunActive);
        }

        self.state = RunState::Initializing;
        self.control.clear();
        self.source = Some(source);
        self.settings = Some(Arc::clone(&settings));
        self.dispatcher = Some(dispatcher.clone());

        // Held until the run ends; must exist before the host window appears.
        let _exclusive_mode = if settings.is_simulate_exclusive_fullscreen() {
            self.platform.begin_exclusive_fullscreen()
        } else {
            None
        };

        self.platform.register_window_classes();

        if let Err(err) = self.create_host_window(source, &settings) {
            logging::report("Failed to create host window", &err);
            self.on_quit();
            return RunOutcome::Failed(err);
        }

        let outcome = match self.initialize(source, &settings, &dispatcher, subsystems) {
            Ok(()) => {
                self.state = RunState::Running;
                RunOutcome::Completed
            }
            Err(err) => {
                self.stop();
                RunOutcome::Failed(err)
            }
        };

        self.run_message_loop();
        outcome
    }

    fn initialize(
        &mut self,
        source: SourceWindow,
        settings: &Arc<Settings>,
        dispatcher: &UiDispatcher,
        subsystems: &mut dyn Subsystems,
    ) -> RuntimeResult<()> {
        let screen_capture = self.initialize_pipeline(source, settings, subsystems)?;

        if settings.is_disable_direct_flip() && !settings.is_breakpoint_mode() {
            if let Err(err) = self.disable_direct_flip(screen_capture) {
                logging::report("Failed to disable DirectFlip", &err);
            }
        }

        self.install_keyboard_hook(settings, dispatcher);

        if let Some(host) = self.host_wnd {
            self.platform.show_window(host);
        }
        Ok(())
    }

    /// Build device, frame source, renderer and cursor in dependency order
    ///
    /// Returns whether the frame source captures the whole screen.
    fn initialize_pipeline(
        &self,
        source: SourceWindow,
        settings: &Arc<Settings>,
        subsystems: &mut dyn Subsystems,
    ) -> RuntimeResult<bool> {
        let mut guard = self.pipeline.borrow_mut();
        let pipeline = &mut *guard;
        pipeline.settings = Some(Arc::clone(settings));

        let device = pipeline.device.insert(subsystems.device_context());
        device
            .initialize()
            .map_err(RuntimeError::DeviceContext)
            .map_err(|e| reported("Failed to initialize device context", e))?;

        let kind = subsystems::select_frame_source(settings.capture_mode())
            .map_err(|e| reported("Unknown capture mode", e))?;
        let frame_source = pipeline
            .frame_source
            .insert(subsystems.frame_source(kind, source));
        info!("Capture mode: {}", frame_source.name());
        frame_source
            .initialize(&mut **device)
            .map_err(RuntimeError::FrameSource)
            .map_err(|e| reported("Failed to initialize frame source", e))?;
        let src = frame_source.src_frame_rect();
        info!("Source window size: {}x{}", src.width(), src.height());

        let renderer = pipeline.renderer.insert(subsystems.effect_renderer());
        renderer
            .initialize(&EffectChain::fsr(), &mut **device, &**frame_source)
            .map_err(RuntimeError::EffectRenderer)
            .map_err(|e| reported("Failed to initialize effect renderer", e))?;

        let cursor = pipeline.cursor.insert(subsystems.cursor_overlay());
        cursor
            .initialize(&mut **device)
            .map_err(RuntimeError::CursorOverlay)
            .map_err(|e| reported("Failed to initialize cursor overlay", e))?;

        Ok(frame_source.is_screen_capture())
    }

    fn create_host_window(&mut self, source: SourceWindow, settings: &Settings) -> RuntimeResult<()> {
        if self.platform.host_window_exists() {
            return Err(RuntimeError::HostWindowExists);
        }

        let rect =
            geometry::calc_host_wnd_rect(source, settings.multi_monitor_usage(), &self.platform)?;

        let style = HostWindowStyle {
            topmost: !settings.is_breakpoint_mode(),
        };
        let host = self
            .platform
            .create_host_window(rect, style, Rc::clone(&self.handlers))?;
        self.host_wnd = Some(host);
        self.host_rect = rect;
        info!("Host window size: {}x{}", rect.width(), rect.height());

        let alpha = if settings.is_disable_direct_flip() {
            HOST_ALPHA_NO_FLIP
        } else {
            OPAQUE_ALPHA
        };
        if let Err(err) = self.platform.set_layered_alpha(host, alpha) {
            error!(error = %err, "Failed to set host window alpha");
        }
        Ok(())
    }

    /// Create the hidden flip suppression window covering the host rect
    ///
    /// It is revealed by the loop once the renderer has presented its second
    /// frame.
    fn disable_direct_flip(&mut self, screen_capture: bool) -> RuntimeResult<()> {
        let ddf = self.platform.create_flip_suppression_window(self.host_rect)?;
        self.ddf_wnd = Some(ddf);

        if let Err(err) = self.platform.set_layered_alpha(ddf, OPAQUE_ALPHA) {
            error!(error = %err, "Failed to set flip suppression window alpha");
        }

        if screen_capture && self.platform.os_version().supports_capture_exclusion() {
            if let Err(err) = self.platform.exclude_from_capture(ddf) {
                error!(error = %err, "Failed to exclude flip suppression window from capture");
            }
        }

        info!("DirectFlip disabled");
        Ok(())
    }

    fn install_keyboard_hook(&mut self, settings: &Arc<Settings>, dispatcher: &UiDispatcher) {
        let toggle = CursorToggle::new(settings, dispatcher.clone());
        let hook_toggle = toggle.clone();
        let weak_pipeline = Rc::downgrade(&self.pipeline);
        // The capture pass must be on screen before the OS takes the screenshot.
        let on_key_down = Box::new(move |vk_code: u32| {
            if hook_toggle.on_key_down(vk_code) && pipeline::render_capture_pass(&weak_pipeline) {
                hook_toggle.take_capture_pass();
            }
        });

        match self.platform.install_keyboard_hook(on_key_down) {
            Ok(hook) => self.keyboard_hook = Some(hook),
            Err(err) => logging::report("Failed to install keyboard hook", &err),
        }
        self.cursor_toggle = Some(toggle);
    }

    /// Destroy the windows of the current run
    ///
    /// Destroying the host posts the quit message; the loop then tears the
    /// run down. Does nothing when no run is active.
    pub fn stop(&mut self) {
        if let Some(ddf) = self.ddf_wnd.take() {
            self.platform.destroy_window(ddf);
        }
        if let Some(host) = self.host_wnd.take() {
            self.state = RunState::Quitting;
            self.platform.destroy_window(host);
        }
    }

    fn run_message_loop(&mut self) {
        debug!("Entering message loop");
        loop {
            if self.control.take_stop() {
                self.stop();
            }
            if self.control.take_toggle_overlay() {
                self.toggle_overlay();
            }

            if self.drain_pending_events() == PumpStatus::Quit {
                self.on_quit();
                break;
            }

            self.render_one_frame();
            self.reveal_flip_suppression();
        }
        debug!("Message loop ended");
    }

    /// Pump the OS queue, then run tasks posted to the UI dispatcher
    fn drain_pending_events(&mut self) -> PumpStatus {
        if self.platform.pump_messages() == PumpStatus::Quit {
            return PumpStatus::Quit;
        }
        if let Some(dispatcher) = self.dispatcher.as_ref() {
            dispatcher.drain();
        }
        PumpStatus::Idle
    }

    fn render_one_frame(&mut self) {
        let cursor_capture = self
            .cursor_toggle
            .as_ref()
            .is_some_and(|toggle| toggle.take_capture_pass());
        self.pipeline.borrow_mut().render(cursor_capture);
    }

    fn reveal_flip_suppression(&mut self) {
        if self.ddf_revealed {
            return;
        }
        let (Some(ddf), Some(host)) = (self.ddf_wnd, self.host_wnd) else {
            return;
        };
        let frame_count = {
            let pipeline = self.pipeline.borrow();
            let Some(renderer) = pipeline.renderer.as_deref() else {
                return;
            };
            renderer.frame_timer().frame_count()
        };
        // A print-screen pass may render between two loop frames.
        if frame_count < FLIP_SUPPRESSION_REVEAL_FRAME {
            return;
        }

        self.platform.show_window(ddf);
        if let Err(err) = self.platform.place_behind(ddf, host) {
            error!(error = %err, "Failed to place flip suppression window");
        }
        self.ddf_revealed = true;
    }

    fn on_quit(&mut self) {
        self.state = RunState::Quitting;

        if let Some(hook) = self.keyboard_hook.take() {
            self.platform.uninstall_keyboard_hook(hook);
        }
        if let Some(toggle) = self.cursor_toggle.take() {
            toggle.cancel_pending();
        }

        self.pipeline.borrow_mut().release();
        self.settings = None;
        self.dispatcher = None;
        self.source = None;

        // The flip suppression window has no owner and outlives a closed host.
        if let Some(ddf) = self.ddf_wnd.take() {
            self.platform.destroy_window(ddf);
        }
        self.handlers.reset();
        self.host_wnd = None;
        self.ddf_revealed = false;
        self.host_rect = Rect::default();

        self.state = RunState::Idle;
        info!("Run ended");
    }

    /// Flip the renderer's overlay UI visibility; no-op without a renderer
    pub fn toggle_overlay(&mut self) {
        let mut pipeline = self.pipeline.borrow_mut();
        if let Some(renderer) = pipeline.renderer.as_deref_mut() {
            let visible = !renderer.is_ui_visible();
            renderer.set_ui_visible(visible);
        }
    }

    /// Route host window messages through `handler` before earlier handlers
    pub fn register_wnd_proc_handler<F>(&self, handler: F) -> u32
    where
        F: Fn(&WindowMessage) -> Option<isize> + 'static,
    {
        self.handlers.register(handler)
    }

    pub fn unregister_wnd_proc_handler(&self, id: u32) -> bool {
        self.handlers.unregister(id)
    }

    /// Shared chain, for collaborators that register from inside a handler
    pub fn handlers(&self) -> Rc<HandlerChain> {
        Rc::clone(&self.handlers)
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Process-wide imaging factory, created on first use
    ///
    /// The cache belongs to this `MagApp`, the single runtime instance of the
    /// process, and is released when it is dropped or on
    /// [`release_shared_resources`](Self::release_shared_resources).
    pub fn imaging_factory(&self) -> Option<P::ImagingFactory> {
        let platform = &self.platform;
        self.imaging_factory
            .get_or_create(|| platform.create_imaging_factory())
    }

    pub fn release_shared_resources(&self) {
        if self.imaging_factory.release() {
            debug!("Imaging factory released");
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn settings(&self) -> Option<&Arc<Settings>> {
        self.settings.as_ref()
    }

    pub fn dispatcher(&self) -> Option<&UiDispatcher> {
        self.dispatcher.as_ref()
    }

    pub fn source_window(&self) -> Option<SourceWindow> {
        self.source
    }

    pub fn host_window(&self) -> Option<WindowHandle> {
        self.host_wnd
    }

    pub fn host_rect(&self) -> Rect {
        self.host_rect
    }

    pub fn flip_suppression_window(&self) -> Option<WindowHandle> {
        self.ddf_wnd
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}

impl<P: Platform> Drop for MagApp<P> {
    fn drop(&mut self) {
        self.release_shared_resources();
    }
}

fn reported(message: &str, err: RuntimeError) -> RuntimeError {
    logging::report(message, &err);
    err
}
