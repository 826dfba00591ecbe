//! Application lifecycle and frame loop
//!
//! An [`Application`] owns the window, renderer, input snapshot and GUI backend
//! and drives them through a fixed per-frame order:
//!
//! 1. input `pre_update`
//! 2. window event polling (may request a close)
//! 3. [`AppLogic::on_update`]
//! 4. GUI `new_frame`, then the [`Application::on_draw_gui`] fan-out
//! 5. GUI `render`, renderer `render`, GUI `render_draw_data`
//! 6. GUI `update_platform_windows`, with the window's context restored after
//! 7. renderer `present`
//!
//! The loop only checks for termination at the top of an iteration, so the
//! frame in which [`Application::close`] succeeds is still presented.
//!
//! Only one application may be initialised per process at a time. The restart
//! flag is process-wide and survives [`Application::shutdown`], which is how a
//! driver knows to build a fresh application.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::config::{ApplicationConfig, ApplicationSpecification};
use crate::events::{CascadingDelegate, MulticastDelegate, Propagation};
use crate::foundation::logging::{self, LogConfig};
use crate::foundation::time::{FpsCounter, FrameInfo, ScopedTimer, Stopwatch, Timer};
use crate::gui::{GuiError, SharedGui};
use crate::input::InputManager;
use crate::platform::{PlatformError, SharedPlatform};
use crate::render::renderer::{RenderError, Renderer};
use crate::render::window::{Window, WindowError};

static INSTANCE_ACTIVE: AtomicBool = AtomicBool::new(false);
static SHOULD_RESTART: AtomicBool = AtomicBool::new(false);

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Another application is initialised in this process
    #[error("An application is already initialised")]
    AlreadyInitialised,

    /// `run` was called before a successful `initialise`
    #[error("Application is not initialised")]
    NotInitialised,

    /// The application specification is unusable
    #[error("Invalid application specification: {0}")]
    InvalidSpecification(String),

    /// Platform error
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Window error
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Renderer error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// GUI error
    #[error("GUI error: {0}")]
    Gui(#[from] GuiError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Error raised by application logic
    #[error("Application error: {0}")]
    Logic(String),
}

/// What the process should do after [`Application::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Leave the process
    Exit,
    /// Build and run a fresh application
    Restart,
}

/// Per-frame application hook
///
/// Closures taking `&mut FrameContext` implement this trait directly.
pub trait AppLogic {
    /// Called once at the end of a successful [`Application::initialise`]
    fn on_initialise(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        Ok(())
    }

    /// Called every frame after events are polled, before the GUI frame begins
    fn on_update(&mut self, ctx: &mut FrameContext<'_>);

    /// Called at the start of [`Application::shutdown`]
    fn on_shutdown(&mut self) {}
}

impl<F> AppLogic for F
where
    F: FnMut(&mut FrameContext<'_>),
{
    fn on_update(&mut self, ctx: &mut FrameContext<'_>) {
        self(ctx);
    }
}

/// State shared with delegate subscribers
struct AppState {
    name: String,
    running: Cell<bool>,
    on_close_requested: CascadingDelegate<()>,
}

impl AppState {
    fn close(&self) {
        if !self.running.get() {
            return;
        }
        if self.on_close_requested.execute(&()).is_stopped() {
            log::debug!("Close of {} vetoed", self.name);
            return;
        }
        log::info!("Closing {}!", self.name);
        self.running.set(false);
    }
}

/// What application logic can reach during a frame
pub struct FrameContext<'a> {
    window: &'a mut Window,
    renderer: &'a mut Renderer,
    input: &'a InputManager,
    state: &'a AppState,
    frame: FrameInfo,
}

impl FrameContext<'_> {
    /// Window the frame is drawn into
    pub fn window(&self) -> &Window {
        &*self.window
    }

    /// Mutable access to the window, e.g. for fullscreen or title changes
    pub fn window_mut(&mut self) -> &mut Window {
        &mut *self.window
    }

    /// Mutable access to the renderer, e.g. to change the clear colour
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut *self.renderer
    }

    /// Input snapshot for this frame
    pub fn input(&self) -> &InputManager {
        self.input
    }

    /// Timing of the current frame
    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    /// Request the loop to stop; see [`Application::close`]
    pub fn close(&self) {
        self.state.close();
    }

    /// False once a close has been requested
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// See [`Application::request_restart`]
    pub fn request_restart(&self, restart: bool) {
        Application::request_restart(restart);
    }

    /// Whether a restart is pending
    pub fn should_restart(&self) -> bool {
        Application::should_restart()
    }
}

/// Window, renderer, input and GUI driven by one frame loop
pub struct Application {
    spec: ApplicationSpecification,
    logging: LogConfig,
    platform: SharedPlatform,
    window: Window,
    renderer: Renderer,
    input: Rc<RefCell<InputManager>>,
    gui: SharedGui,
    state: Rc<AppState>,
    on_draw_gui: MulticastDelegate<FrameInfo>,
    logic: Option<Box<dyn AppLogic>>,
    timer: Timer,
    fps: FpsCounter,
    owns_instance: bool,
    initialised: bool,
}

impl Application {
    /// Build an application; nothing native is touched until [`Application::initialise`]
    pub fn new(config: ApplicationConfig, platform: SharedPlatform, gui: SharedGui) -> Result<Self, AppError> {
        config
            .application
            .validate()
            .map_err(AppError::InvalidSpecification)?;

        let state = Rc::new(AppState {
            name: config.application.name.clone(),
            running: Cell::new(false),
            on_close_requested: CascadingDelegate::new(),
        });

        Ok(Self {
            spec: config.application,
            logging: config.logging,
            window: Window::new(config.window, platform.clone()),
            renderer: Renderer::new(config.renderer),
            platform,
            input: Rc::new(RefCell::new(InputManager::new())),
            gui,
            state,
            on_draw_gui: MulticastDelegate::new(),
            logic: None,
            timer: Timer::new(),
            fps: FpsCounter::new(),
            owns_instance: false,
            initialised: false,
        })
    }

    /// Attach the per-frame logic hook
    #[must_use]
    pub fn with_logic(mut self, logic: impl AppLogic + 'static) -> Self {
        self.logic = Some(Box::new(logic));
        self
    }

    /// Bring up logging, the platform, the window, input, renderer and GUI.
    ///
    /// On failure the error is logged and shown in a message box. Call
    /// [`Application::shutdown`] afterwards either way; it tears down whatever
    /// was brought up.
    pub fn initialise(&mut self) -> Result<(), AppError> {
        if self.owns_instance || INSTANCE_ACTIVE.swap(true, Ordering::SeqCst) {
            log::error!("Application already initialised!");
            return Err(AppError::AlreadyInitialised);
        }
        self.owns_instance = true;

        logging::init(&self.logging, &self.spec.author, &self.spec.name);
        log::info!(
            "Initialising application: {} {} by {}",
            self.spec.name,
            self.spec.version,
            self.spec.author
        );
        if let Ok(dir) = std::env::current_dir() {
            log::info!("Working directory: {}", dir.display());
        }

        let result = {
            let _timer = ScopedTimer::new("Application initialisation");
            self.initialise_subsystems()
        };
        if let Err(e) = result {
            let title = match &e {
                AppError::Platform(_) => "Platform Error",
                AppError::Render(_) => "Renderer Error",
                _ => "Error",
            };
            self.show_error(&format!("Failed to initialise {}: {e}", self.spec.name), title);
            return Err(e);
        }

        self.initialised = true;
        Ok(())
    }

    fn initialise_subsystems(&mut self) -> Result<(), AppError> {
        {
            let mut platform = self.platform.borrow_mut();
            platform.init()?;
            log::debug!("Platform '{}' initialised", platform.name());
        }

        self.window.create(&self.renderer.specification().context)?;
        self.input.borrow_mut().init();
        self.bind_window_events();

        self.renderer.init(&self.window)?;
        self.gui.borrow_mut().init(&self.window)?;

        if let Some(logic) = self.logic.as_mut() {
            let input = self.input.borrow();
            let mut ctx = FrameContext {
                window: &mut self.window,
                renderer: &mut self.renderer,
                input: &input,
                state: &self.state,
                frame: FrameInfo::default(),
            };
            logic.on_initialise(&mut ctx)?;
        }
        Ok(())
    }

    fn bind_window_events(&self) {
        let state = self.state.clone();
        self.window.on_close().bind(move |_: &()| {
            state.close();
            Propagation::Continue
        });

        // Raw events reach the GUI first; it does not consume them, so the
        // typed input below always sees them too.
        let gui = self.gui.clone();
        self.window.on_platform_event().bind(move |event| {
            gui.borrow_mut().process_event(event);
            Propagation::Continue
        });

        let input = self.input.clone();
        self.window.on_keyboard().bind(move |event| {
            input.borrow_mut().process_keyboard_event(event);
            Propagation::Continue
        });
        let input = self.input.clone();
        self.window.on_mouse_button().bind(move |event| {
            input.borrow_mut().process_mouse_button_event(event);
            Propagation::Continue
        });
        let input = self.input.clone();
        self.window.on_mouse_motion().bind(move |event| {
            input.borrow_mut().process_mouse_motion_event(event);
            Propagation::Continue
        });
        let input = self.input.clone();
        self.window.on_mouse_wheel().bind(move |event| {
            input.borrow_mut().process_mouse_wheel_event(event);
            Propagation::Continue
        });
        let input = self.input.clone();
        self.window.on_text_input().bind(move |character: &char| {
            input.borrow_mut().process_text_input(*character);
            Propagation::Continue
        });
        let input = self.input.clone();
        self.window.on_focus().bind(move |focused: &bool| {
            input.borrow_mut().process_focus_event(*focused);
            Propagation::Continue
        });
    }

    /// Run frames until [`Application::close`] succeeds
    pub fn run(&mut self) -> Result<(), AppError> {
        if !self.initialised {
            return Err(AppError::NotInitialised);
        }

        self.state.running.set(true);
        self.timer.reset();
        while self.state.running.get() {
            self.run_frame()?;
        }

        log::info!(
            "{} ran {} frames in {:.2}s (avg {} FPS)",
            self.spec.name,
            self.timer.frame_count(),
            self.timer.total_time(),
            self.fps.fps()
        );
        Ok(())
    }

    /// Run exactly one frame, regardless of the running flag
    pub fn run_frame(&mut self) -> Result<(), AppError> {
        if !self.initialised {
            return Err(AppError::NotInitialised);
        }

        let frame = self.begin_frame_timing();

        self.input.borrow_mut().pre_update();
        self.window.poll_events();

        if let Some(logic) = self.logic.as_mut() {
            let input = self.input.borrow();
            let mut ctx = FrameContext {
                window: &mut self.window,
                renderer: &mut self.renderer,
                input: &input,
                state: &self.state,
                frame,
            };
            logic.on_update(&mut ctx);
        }

        self.gui.borrow_mut().new_frame(&frame);
        self.on_draw_gui.execute(&frame);
        self.gui.borrow_mut().render();

        self.renderer.render()?;
        if let Some(device) = self.renderer.device() {
            self.gui.borrow_mut().render_draw_data(device.as_ref());
        }

        // Detached GUI viewports render with their own contexts.
        self.gui.borrow_mut().update_platform_windows();
        self.window.make_context_current()?;

        self.renderer.present()?;
        Ok(())
    }

    fn begin_frame_timing(&mut self) -> FrameInfo {
        let delta = self.timer.tick();
        if delta > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sample = (1.0 / delta).min(f32::from(u16::MAX)) as u16;
            self.fps.add_sample(sample);
        }
        FrameInfo {
            frame_index: self.renderer.frame_index(),
            delta_seconds: delta,
            fps: self.fps.fps(),
        }
    }

    /// Ask the loop to stop.
    ///
    /// No-op unless running. Subscribers of [`Application::on_close_requested`]
    /// can veto by returning [`Propagation::Stop`].
    pub fn close(&self) {
        self.state.close();
    }

    /// Tear down in reverse order of initialisation. Safe to call repeatedly,
    /// and after a failed [`Application::initialise`].
    pub fn shutdown(&mut self) -> ShutdownOutcome {
        if !self.owns_instance {
            return Self::outcome();
        }
        log::info!("Shutting down {}", self.spec.name);
        let teardown = Stopwatch::start_new();

        if self.initialised {
            if let Some(logic) = self.logic.as_mut() {
                logic.on_shutdown();
            }
        }
        self.state.running.set(false);

        self.renderer.shutdown(&self.window);
        {
            let mut gui = self.gui.borrow_mut();
            if gui.is_initialised() {
                gui.shutdown();
            }
        }
        self.input.borrow_mut().shutdown();
        if self.window.is_created() {
            self.window.destroy();
        }
        {
            let mut platform = self.platform.borrow_mut();
            if platform.is_initialized() {
                platform.terminate();
            }
        }

        log::debug!("Teardown took {:.3}ms", teardown.elapsed_millis());

        let outcome = Self::outcome();
        // A restarted application keeps writing to the same log.
        if outcome == ShutdownOutcome::Exit {
            logging::shutdown();
        }

        self.initialised = false;
        self.owns_instance = false;
        INSTANCE_ACTIVE.store(false, Ordering::SeqCst);
        outcome
    }

    fn outcome() -> ShutdownOutcome {
        if Self::should_restart() {
            ShutdownOutcome::Restart
        } else {
            ShutdownOutcome::Exit
        }
    }

    /// Log an error and show it in a message box
    pub fn show_error(&self, message: &str, title: &str) {
        log::error!("{message}");
        self.platform
            .borrow()
            .show_message_box(title, message, self.window.id());
    }

    /// Ask for a fresh application after shutdown
    pub fn request_restart(restart: bool) {
        SHOULD_RESTART.store(restart, Ordering::SeqCst);
    }

    /// Whether the next shutdown reports [`ShutdownOutcome::Restart`]
    pub fn should_restart() -> bool {
        SHOULD_RESTART.load(Ordering::SeqCst)
    }

    /// True between `run` starting and the loop exiting
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// True after a successful `initialise` and before `shutdown`
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Settings the application was built from
    pub fn specification(&self) -> &ApplicationSpecification {
        &self.spec
    }

    /// Application window
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Mutable access to the application window
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Frame renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Current input snapshot
    pub fn input(&self) -> Ref<'_, InputManager> {
        self.input.borrow()
    }

    /// Close requests; a `Stop` keeps the application running
    pub fn on_close_requested(&self) -> &CascadingDelegate<()> {
        &self.state.on_close_requested
    }

    /// Fan-out for contributing GUI each frame
    pub fn on_draw_gui(&self) -> &MulticastDelegate<FrameInfo> {
        &self.on_draw_gui
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        if self.owns_instance {
            self.shutdown();
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("spec", &self.spec)
            .field("window", &self.window)
            .field("running", &self.state.running.get())
            .field("initialised", &self.initialised)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui::{GuiBackend, NullGui};
    use crate::platform::{CallTrace, HeadlessPlatform, Platform, PlatformEvent};
    use crate::render::device::GraphicsDevice;
    use serial_test::serial;

    struct TracingGui {
        trace: CallTrace,
        initialised: bool,
        events: usize,
    }

    impl GuiBackend for TracingGui {
        fn name(&self) -> &str {
            "tracing"
        }
        fn init(&mut self, _window: &Window) -> Result<(), GuiError> {
            self.initialised = true;
            Ok(())
        }
        fn is_initialised(&self) -> bool {
            self.initialised
        }
        fn process_event(&mut self, _event: &PlatformEvent) {
            self.events += 1;
        }
        fn new_frame(&mut self, _frame: &FrameInfo) {
            self.trace.borrow_mut().push("gui.new_frame".to_string());
        }
        fn render(&mut self) {
            self.trace.borrow_mut().push("gui.render".to_string());
        }
        fn render_draw_data(&mut self, _device: &dyn GraphicsDevice) {
            self.trace.borrow_mut().push("gui.render_draw_data".to_string());
        }
        fn update_platform_windows(&mut self) {
            self.trace.borrow_mut().push("gui.update_platform_windows".to_string());
        }
        fn shutdown(&mut self) {
            self.initialised = false;
        }
    }

    fn test_config() -> ApplicationConfig {
        let mut config = ApplicationConfig::new("Test App");
        config.logging.file = false;
        config
    }

    fn headless() -> (Rc<RefCell<HeadlessPlatform>>, SharedPlatform) {
        let platform = Rc::new(RefCell::new(HeadlessPlatform::new()));
        let shared: SharedPlatform = platform.clone();
        (platform, shared)
    }

    #[test]
    #[serial]
    fn test_new_rejects_bad_specification() {
        let (_headless, platform) = headless();
        let mut config = test_config();
        config.application.author = String::new();
        assert!(matches!(
            Application::new(config, platform, NullGui::shared()),
            Err(AppError::InvalidSpecification(_))
        ));
    }

    #[test]
    #[serial]
    fn test_run_requires_initialise() {
        let (_headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared()).unwrap();
        assert!(matches!(app.run(), Err(AppError::NotInitialised)));
        assert_eq!(app.shutdown(), ShutdownOutcome::Exit);
    }

    #[test]
    #[serial]
    fn test_frame_order() {
        let (headless, platform) = headless();
        let trace = CallTrace::default();
        headless.borrow_mut().set_trace(trace.clone());

        let gui = Rc::new(RefCell::new(TracingGui {
            trace: trace.clone(),
            initialised: false,
            events: 0,
        }));
        let logic_trace = trace.clone();
        let mut app = Application::new(test_config(), platform, gui)
            .unwrap()
            .with_logic(move |ctx: &mut FrameContext<'_>| {
                logic_trace.borrow_mut().push("logic.update".to_string());
                ctx.close();
            });
        let draw_trace = trace.clone();
        app.on_draw_gui().bind(move |_: &FrameInfo| {
            draw_trace.borrow_mut().push("draw_gui".to_string());
        });

        app.initialise().unwrap();
        trace.borrow_mut().clear();
        app.run().unwrap();

        assert_eq!(
            *trace.borrow(),
            vec![
                "platform.poll_events",
                "logic.update",
                "gui.new_frame",
                "draw_gui",
                "gui.render",
                "device.clear",
                "gui.render_draw_data",
                "gui.update_platform_windows",
                "platform.swap_buffers",
            ]
        );
        assert_eq!(app.renderer().frame_index(), 1);
        app.shutdown();
    }

    #[test]
    #[serial]
    fn test_close_veto_keeps_running() {
        let (_headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared()).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let veto = calls.clone();
        app.on_close_requested().bind(move |_: &()| {
            veto.borrow_mut().push("veto");
            Propagation::Stop
        });
        let downstream = calls.clone();
        app.on_close_requested().bind(move |_: &()| {
            downstream.borrow_mut().push("downstream");
            Propagation::Continue
        });

        app.initialise().unwrap();

        // Not running yet: nothing is asked.
        app.close();
        assert!(calls.borrow().is_empty());

        app.state.running.set(true);
        app.close();
        assert!(app.is_running());
        assert_eq!(*calls.borrow(), vec!["veto"]);

        app.run_frame().unwrap();
        assert!(app.is_running());
        app.shutdown();
        assert!(!app.is_running());
    }

    #[test]
    #[serial]
    fn test_veto_then_close_presents_final_frame() {
        let (headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared())
            .unwrap()
            .with_logic(|ctx: &mut FrameContext<'_>| ctx.close());

        let remaining = Rc::new(Cell::new(2));
        let vetoes = remaining.clone();
        app.on_close_requested().bind(move |_: &()| {
            let veto = vetoes.get() > 0;
            if veto {
                vetoes.set(vetoes.get() - 1);
            }
            Propagation::stop_if(veto)
        });

        app.initialise().unwrap();
        app.run().unwrap();

        // Two vetoed frames, then the closing frame still completes.
        assert_eq!(app.renderer().frame_index(), 3);
        let id = app.window().id().unwrap();
        assert_eq!(headless.borrow().window(id).unwrap().swap_count, 3);
        assert!(!app.is_running());
        app.shutdown();
    }

    #[test]
    #[serial]
    fn test_second_close_is_noop() {
        let (_headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared())
            .unwrap()
            .with_logic(|ctx: &mut FrameContext<'_>| {
                ctx.close();
                ctx.close();
            });

        let requests = Rc::new(Cell::new(0));
        let counter = requests.clone();
        app.on_close_requested().bind(move |_: &()| {
            counter.set(counter.get() + 1);
            Propagation::Continue
        });

        app.initialise().unwrap();
        app.run().unwrap();
        assert_eq!(requests.get(), 1);

        app.close();
        assert_eq!(requests.get(), 1);
        app.shutdown();
    }

    #[test]
    #[serial]
    fn test_window_close_event_stops_loop() {
        let (headless, platform) = headless();
        let gui = Rc::new(RefCell::new(TracingGui {
            trace: CallTrace::default(),
            initialised: false,
            events: 0,
        }));
        let mut app = Application::new(test_config(), platform, gui.clone()).unwrap();
        app.initialise().unwrap();

        let id = app.window().id().unwrap();
        headless
            .borrow_mut()
            .push_event(PlatformEvent::CloseRequested { window: id });
        app.run().unwrap();

        assert_eq!(app.renderer().frame_index(), 1);
        assert_eq!(gui.borrow().events, 1);
        app.shutdown();
    }

    #[test]
    #[serial]
    fn test_single_instance_guard() {
        let (_first_headless, first_platform) = headless();
        let (_second_headless, second_platform) = headless();
        let mut first = Application::new(test_config(), first_platform, NullGui::shared()).unwrap();
        let mut second = Application::new(test_config(), second_platform, NullGui::shared()).unwrap();

        first.initialise().unwrap();
        assert!(matches!(first.initialise(), Err(AppError::AlreadyInitialised)));
        assert!(matches!(second.initialise(), Err(AppError::AlreadyInitialised)));

        // The second application never owned the guard; its shutdown keeps it held.
        second.shutdown();
        assert!(matches!(second.initialise(), Err(AppError::AlreadyInitialised)));

        first.shutdown();
        second.initialise().unwrap();
        second.shutdown();
    }

    #[test]
    #[serial]
    fn test_restart_flag_survives_shutdown() {
        let (_headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared())
            .unwrap()
            .with_logic(|ctx: &mut FrameContext<'_>| {
                ctx.request_restart(true);
                ctx.close();
            });
        Application::request_restart(false);

        app.initialise().unwrap();
        app.run().unwrap();
        assert_eq!(app.shutdown(), ShutdownOutcome::Restart);
        assert!(Application::should_restart());
        assert_eq!(app.shutdown(), ShutdownOutcome::Restart);

        Application::request_restart(false);
        assert_eq!(app.shutdown(), ShutdownOutcome::Exit);
    }

    #[test]
    #[serial]
    fn test_failed_initialise_then_shutdown() {
        let (headless, platform) = headless();
        headless.borrow_mut().fail_next_window("no display");

        let mut app = Application::new(test_config(), platform, NullGui::shared()).unwrap();
        assert!(matches!(app.initialise(), Err(AppError::Window(_))));

        let boxes = headless.borrow().message_boxes();
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].1.contains("no display"));

        assert_eq!(app.shutdown(), ShutdownOutcome::Exit);
        assert!(!headless.borrow().is_initialized());

        // The guard was released, so a fresh application can come up.
        let (_headless, platform) = self::headless();
        let mut next = Application::new(test_config(), platform, NullGui::shared()).unwrap();
        next.initialise().unwrap();
        next.shutdown();
    }

    #[test]
    #[serial]
    fn test_input_reaches_logic() {
        use crate::input::{KeyCode, Modifiers};
        use crate::platform::KeyboardEvent;

        let (headless, platform) = headless();
        let mut app = Application::new(test_config(), platform, NullGui::shared())
            .unwrap()
            .with_logic(|ctx: &mut FrameContext<'_>| {
                if ctx.input().is_key_down_this_frame(KeyCode::Escape) {
                    ctx.close();
                }
            });
        app.initialise().unwrap();

        let id = app.window().id().unwrap();
        headless
            .borrow_mut()
            .push_event(PlatformEvent::Keyboard(KeyboardEvent {
                window: id,
                key: KeyCode::Escape,
                scancode: 9,
                pressed: true,
                repeat: false,
                modifiers: Modifiers::empty(),
            }));
        app.run().unwrap();

        assert_eq!(app.renderer().frame_index(), 1);
        assert!(app.input().is_key_down(KeyCode::Escape));
        app.shutdown();
        assert!(!app.input().is_key_down(KeyCode::Escape));
    }

    #[test]
    #[serial]
    fn test_text_and_focus_reach_input() {
        use crate::input::{KeyCode, Modifiers};
        use crate::platform::KeyboardEvent;

        let (headless, platform) = headless();
        let seen = Rc::new(RefCell::new(None));
        let recorded = seen.clone();
        let mut app = Application::new(test_config(), platform, NullGui::shared())
            .unwrap()
            .with_logic(move |ctx: &mut FrameContext<'_>| {
                let input = ctx.input();
                *recorded.borrow_mut() = Some((
                    input.text_input().to_owned(),
                    input.has_focus(),
                    input.is_key_down(KeyCode::W),
                    input.is_key_up_this_frame(KeyCode::W),
                ));
                ctx.close();
            });
        app.initialise().unwrap();

        let id = app.window().id().unwrap();
        {
            let mut headless = headless.borrow_mut();
            headless.push_event(PlatformEvent::Keyboard(KeyboardEvent {
                window: id,
                key: KeyCode::W,
                scancode: 25,
                pressed: true,
                repeat: false,
                modifiers: Modifiers::empty(),
            }));
            headless.push_event(PlatformEvent::TextInput {
                window: id,
                character: 'h',
            });
            headless.push_event(PlatformEvent::TextInput {
                window: id,
                character: 'i',
            });
            headless.push_event(PlatformEvent::FocusChanged {
                window: id,
                focused: false,
            });
        }
        app.run().unwrap();
        app.shutdown();

        assert_eq!(
            seen.borrow().clone(),
            Some(("hi".to_owned(), false, false, true))
        );
    }
}
