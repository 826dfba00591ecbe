//! Window management
//!
//! A [`Window`] owns exactly one native window and the graphics context
//! created with it. Both are allocated by [`Window::create`] and released
//! together by [`Window::destroy`]. Native events are drained once per frame by
//! [`Window::poll_events`] and republished through the window's delegates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{CascadeOutcome, CascadingDelegate};
use crate::foundation::math::{is_positive_extent, ivec2, IVec2, Vec2};
use crate::platform::{
    ContextAttributes, ContextId, KeyboardEvent, MouseButtonEvent, MouseMotionEvent,
    MouseWheelEvent, Platform, PlatformError, PlatformEvent, SharedPlatform, SwapInterval,
    WindowId, WindowRect,
};

/// Window errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// The operation needs a created window
    #[error("Window has not been created")]
    NotCreated,

    /// `create` was called on a live window
    #[error("Window has already been created")]
    AlreadyCreated,

    /// The specification cannot be realised
    #[error("Invalid window specification: {0}")]
    InvalidSpecification(String),

    /// The platform rejected a call
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Buffer swap synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VSyncMode {
    /// Present immediately
    Off,
    /// Wait for vertical blank
    #[default]
    On,
    /// Wait for vertical blank unless the frame is late
    Adaptive,
}

impl VSyncMode {
    /// Next mode in the Off → On → Adaptive cycle
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Adaptive,
            Self::Adaptive => Self::Off,
        }
    }

    /// Platform swap interval for this mode
    pub fn swap_interval(self) -> SwapInterval {
        match self {
            Self::Off => SwapInterval::Immediate,
            Self::On => SwapInterval::Synchronized,
            Self::Adaptive => SwapInterval::Adaptive,
        }
    }
}

impl fmt::Display for VSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "Off",
            Self::On => "On",
            Self::Adaptive => "Adaptive",
        })
    }
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpecification {
    /// Title bar text
    pub title: String,
    /// Client area size
    pub size: IVec2,
    /// Size requested at creation, kept for leaving fullscreen
    pub original_size: IVec2,
    /// Minimum size; a non-positive extent means unbounded
    pub min_size: IVec2,
    /// Maximum size; a non-positive extent means unbounded
    pub max_size: IVec2,
    /// Top-left position when not centered
    pub position: IVec2,
    /// Show the window as soon as it is created
    pub start_visible: bool,
    /// Centre on the primary monitor at creation
    pub centered: bool,
    /// Start in fullscreen
    pub fullscreen: bool,
    /// Allow the user to resize the window
    pub resizable: bool,
    /// Swap synchronisation
    pub vsync: VSyncMode,
}

impl Default for WindowSpecification {
    fn default() -> Self {
        Self {
            title: "Mineprint".to_string(),
            size: ivec2(1280, 720),
            original_size: ivec2(1280, 720),
            min_size: ivec2(0, 0),
            max_size: ivec2(0, 0),
            position: ivec2(0, 0),
            start_visible: true,
            centered: true,
            fullscreen: false,
            resizable: true,
            vsync: VSyncMode::On,
        }
    }
}

impl WindowSpecification {
    fn validate(&self) -> Result<(), WindowError> {
        if self.title.is_empty() {
            return Err(WindowError::InvalidSpecification(
                "title must not be empty".to_string(),
            ));
        }
        if !is_positive_extent(&self.size) {
            return Err(WindowError::InvalidSpecification(format!(
                "size must be positive, got {}x{}",
                self.size.x, self.size.y
            )));
        }
        Ok(())
    }
}

/// A native window with its graphics context
pub struct Window {
    spec: WindowSpecification,
    platform: SharedPlatform,
    handle: Option<WindowId>,
    context: Option<ContextId>,
    visible: bool,
    /// Rectangle to return to when leaving fullscreen
    windowed: Option<WindowRect>,

    on_platform_event: CascadingDelegate<PlatformEvent>,
    on_close: CascadingDelegate<()>,
    on_resize: CascadingDelegate<IVec2>,
    on_move: CascadingDelegate<IVec2>,
    on_focus: CascadingDelegate<bool>,
    on_keyboard: CascadingDelegate<KeyboardEvent>,
    on_mouse_button: CascadingDelegate<MouseButtonEvent>,
    on_mouse_motion: CascadingDelegate<MouseMotionEvent>,
    on_mouse_wheel: CascadingDelegate<MouseWheelEvent>,
    on_text_input: CascadingDelegate<char>,
}

impl Window {
    /// Describe a window without allocating anything native
    pub fn new(spec: WindowSpecification, platform: SharedPlatform) -> Self {
        Self {
            spec,
            platform,
            handle: None,
            context: None,
            visible: false,
            windowed: None,
            on_platform_event: CascadingDelegate::new(),
            on_close: CascadingDelegate::new(),
            on_resize: CascadingDelegate::new(),
            on_move: CascadingDelegate::new(),
            on_focus: CascadingDelegate::new(),
            on_keyboard: CascadingDelegate::new(),
            on_mouse_button: CascadingDelegate::new(),
            on_mouse_motion: CascadingDelegate::new(),
            on_mouse_wheel: CascadingDelegate::new(),
            on_text_input: CascadingDelegate::new(),
        }
    }

    /// Allocate the native window and its graphics context.
    ///
    /// If a step fails after the native window exists, whatever was allocated
    /// is released again before the error is returned.
    pub fn create(&mut self, attributes: &ContextAttributes) -> Result<(), WindowError> {
        if self.handle.is_some() {
            return Err(WindowError::AlreadyCreated);
        }
        self.spec.validate()?;
        self.spec.original_size = self.spec.size;

        let mut platform = self.platform.borrow_mut();

        let id = platform.create_window(&self.spec, attributes)?;
        self.windowed = None;
        let context = match Self::configure(&mut *platform, id, &mut self.spec, &mut self.windowed) {
            Ok(context) => context,
            Err(e) => {
                log::error!("Failed to configure window '{}': {e}", self.spec.title);
                platform.destroy_window(id);
                return Err(e.into());
            }
        };

        self.handle = Some(id);
        self.context = Some(context);
        self.visible = self.spec.start_visible;

        log::info!(
            "Created window '{}' ({}x{} at {},{}, vsync {}) on {}",
            self.spec.title,
            self.spec.size.x,
            self.spec.size.y,
            self.spec.position.x,
            self.spec.position.y,
            self.spec.vsync,
            platform.name()
        );
        Ok(())
    }

    fn configure(
        platform: &mut dyn Platform,
        id: WindowId,
        spec: &mut WindowSpecification,
        windowed: &mut Option<WindowRect>,
    ) -> Result<ContextId, PlatformError> {
        platform.set_window_size_limits(id, spec.min_size, spec.max_size)?;
        platform.set_window_resizable(id, spec.resizable)?;

        if spec.centered {
            spec.position = platform.center_window(id)?;
        } else {
            platform.set_window_position(id, spec.position)?;
        }

        if spec.fullscreen {
            let restore = WindowRect {
                position: spec.position,
                size: spec.size,
            };
            let rect = platform.set_window_fullscreen(id, true, restore)?;
            *windowed = Some(restore);
            spec.position = rect.position;
            spec.size = rect.size;
        }

        if spec.start_visible {
            platform.set_window_visible(id, true)?;
        }

        let context = platform.create_context(id)?;
        if let Err(e) = platform.make_context_current(id, context) {
            platform.destroy_context(context);
            return Err(e);
        }

        spec.vsync = Self::apply_vsync(platform, spec.vsync);
        Ok(context)
    }

    /// Apply `mode` to the current context, returning the mode in effect
    fn apply_vsync(platform: &mut dyn Platform, mode: VSyncMode) -> VSyncMode {
        if platform.set_swap_interval(mode.swap_interval()) {
            return mode;
        }

        if mode == VSyncMode::Adaptive {
            log::warn!("Adaptive vsync is not supported, falling back to vsync On");
            if !platform.set_swap_interval(SwapInterval::Synchronized) {
                log::warn!("Failed to enable vsync");
            }
            VSyncMode::On
        } else {
            log::warn!("Failed to set vsync {mode}");
            mode
        }
    }

    /// Drain the platform event queue and republish every event.
    ///
    /// Each event goes to [`Window::on_platform_event`] first and then to the
    /// typed delegate for its category. Close requests for other windows are
    /// dropped. Size and position are stored before their delegates fire.
    pub fn poll_events(&mut self) {
        let Some(id) = self.handle else {
            return;
        };
        let events = self.platform.borrow_mut().poll_events();

        for event in events {
            // A veto here only cuts the raw chain short; typed dispatch still runs.
            self.on_platform_event.execute(&event);

            let outcome = match event {
                PlatformEvent::CloseRequested { window } => {
                    if window != id {
                        continue;
                    }
                    self.on_close.execute(&())
                }
                PlatformEvent::Resized { size, .. } => {
                    self.spec.size = size;
                    self.on_resize.execute(&size)
                }
                PlatformEvent::Moved { position, .. } => {
                    self.spec.position = position;
                    self.on_move.execute(&position)
                }
                PlatformEvent::FocusChanged { focused, .. } => self.on_focus.execute(&focused),
                PlatformEvent::Keyboard(event) => self.on_keyboard.execute(&event),
                PlatformEvent::MouseButton(event) => self.on_mouse_button.execute(&event),
                PlatformEvent::MouseMotion(event) => self.on_mouse_motion.execute(&event),
                PlatformEvent::MouseWheel(event) => self.on_mouse_wheel.execute(&event),
                PlatformEvent::TextInput { character, .. } => self.on_text_input.execute(&character),
            };
            if let CascadeOutcome::Stopped { index } = outcome {
                log::trace!("Window event handled by subscriber {index}");
            }
        }
    }

    /// Release the context and the native window. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.unbind_all();

        if self.handle.is_none() && self.context.is_none() {
            return;
        }

        let mut platform = self.platform.borrow_mut();
        if let Some(context) = self.context.take() {
            platform.destroy_context(context);
        }
        if let Some(id) = self.handle.take() {
            platform.destroy_window(id);
            log::info!("Destroyed window '{}'", self.spec.title);
        }
        self.visible = false;
        self.windowed = None;
    }

    fn unbind_all(&self) {
        self.on_platform_event.unbind_all();
        self.on_close.unbind_all();
        self.on_resize.unbind_all();
        self.on_move.unbind_all();
        self.on_focus.unbind_all();
        self.on_keyboard.unbind_all();
        self.on_mouse_button.unbind_all();
        self.on_mouse_motion.unbind_all();
        self.on_mouse_wheel.unbind_all();
        self.on_text_input.unbind_all();
    }

    fn handle(&self) -> Result<WindowId, WindowError> {
        self.handle.ok_or(WindowError::NotCreated)
    }

    /// Whether the native window exists
    pub fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    /// Native window handle
    pub fn id(&self) -> Option<WindowId> {
        self.handle
    }

    /// Graphics context handle
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Platform this window lives on
    pub fn platform(&self) -> &SharedPlatform {
        &self.platform
    }

    /// Current specification, including live size and position
    pub fn specification(&self) -> &WindowSpecification {
        &self.spec
    }

    /// Current title
    pub fn title(&self) -> &str {
        &self.spec.title
    }

    /// Client size in screen coordinates
    pub fn size(&self) -> IVec2 {
        self.spec.size
    }

    /// Top-left position on screen
    pub fn position(&self) -> IVec2 {
        self.spec.position
    }

    /// Requested vsync mode
    pub fn vsync(&self) -> VSyncMode {
        self.spec.vsync
    }

    /// Whether the window covers its monitor
    pub fn is_fullscreen(&self) -> bool {
        self.spec.fullscreen
    }

    /// Whether the user may resize the window
    pub fn is_resizable(&self) -> bool {
        self.spec.resizable
    }

    /// Whether the window is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Change the title
    pub fn set_title(&mut self, title: &str) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_window_title(id, title)?;
        self.spec.title = title.to_string();
        Ok(())
    }

    /// Resize the client area
    pub fn set_size(&mut self, size: IVec2) -> Result<(), WindowError> {
        let id = self.handle()?;
        if !is_positive_extent(&size) {
            return Err(PlatformError::InvalidGeometry(format!("{}x{}", size.x, size.y)).into());
        }
        self.platform.borrow_mut().set_window_size(id, size)?;
        self.spec.size = size;
        Ok(())
    }

    /// Set the minimum client size; zero components lift the limit
    pub fn set_min_size(&mut self, min_size: IVec2) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform
            .borrow_mut()
            .set_window_size_limits(id, min_size, self.spec.max_size)?;
        self.spec.min_size = min_size;
        Ok(())
    }

    /// Set the maximum client size; zero components lift the limit
    pub fn set_max_size(&mut self, max_size: IVec2) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform
            .borrow_mut()
            .set_window_size_limits(id, self.spec.min_size, max_size)?;
        self.spec.max_size = max_size;
        Ok(())
    }

    /// Move the window
    pub fn set_position(&mut self, position: IVec2) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_window_position(id, position)?;
        self.spec.position = position;
        Ok(())
    }

    /// Centre the window on the primary monitor
    pub fn center(&mut self) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.spec.position = self.platform.borrow_mut().center_window(id)?;
        Ok(())
    }

    /// Enter or leave fullscreen on the primary monitor.
    ///
    /// Leaving restores the position and size the window had when it entered.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), WindowError> {
        let id = self.handle()?;
        if fullscreen == self.spec.fullscreen {
            return Ok(());
        }

        let restore = self.windowed.unwrap_or(WindowRect {
            position: self.spec.position,
            size: if fullscreen {
                self.spec.size
            } else {
                self.spec.original_size
            },
        });
        let rect = self
            .platform
            .borrow_mut()
            .set_window_fullscreen(id, fullscreen, restore)?;

        self.windowed = fullscreen.then_some(restore);
        self.spec.position = rect.position;
        self.spec.size = rect.size;
        self.spec.fullscreen = fullscreen;
        Ok(())
    }

    /// Flip between fullscreen and windowed
    pub fn toggle_fullscreen(&mut self) -> Result<(), WindowError> {
        self.set_fullscreen(!self.spec.fullscreen)
    }

    /// Allow or forbid user resizing
    pub fn set_resizable(&mut self, resizable: bool) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_window_resizable(id, resizable)?;
        self.spec.resizable = resizable;
        Ok(())
    }

    /// Change swap synchronisation; unsupported adaptive sync falls back to On
    pub fn set_vsync(&mut self, mode: VSyncMode) -> Result<(), WindowError> {
        let id = self.handle()?;
        let context = self.context.ok_or(WindowError::NotCreated)?;

        let mut platform = self.platform.borrow_mut();
        platform.make_context_current(id, context)?;
        self.spec.vsync = Self::apply_vsync(&mut *platform, mode);
        log::debug!("VSync set to {}", self.spec.vsync);
        Ok(())
    }

    /// Make the window visible
    pub fn show(&mut self) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_window_visible(id, true)?;
        self.visible = true;
        Ok(())
    }

    /// Hide the window
    pub fn hide(&mut self) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_window_visible(id, false)?;
        self.visible = false;
        Ok(())
    }

    /// Capture the cursor for relative mouse motion
    pub fn lock_cursor(&mut self) -> Result<(), WindowError> {
        let id = self.handle()?;
        self.platform.borrow_mut().set_cursor_locked(id, true)?;
        Ok(())
    }

    /// Release the cursor, placing it at the window centre
    pub fn unlock_cursor(&mut self) -> Result<(), WindowError> {
        let id = self.handle()?;
        let centre = Vec2::new(self.spec.size.x as f32, self.spec.size.y as f32) / 2.0;
        let mut platform = self.platform.borrow_mut();
        platform.warp_cursor(id, centre)?;
        platform.set_cursor_locked(id, false)?;
        Ok(())
    }

    /// Whether the cursor is captured by the window
    pub fn is_cursor_locked(&self) -> bool {
        self.handle
            .is_some_and(|id| self.platform.borrow().is_cursor_locked(id))
    }

    /// Make this window's context current on the calling thread
    pub fn make_context_current(&self) -> Result<(), WindowError> {
        let id = self.handle()?;
        let context = self.context.ok_or(WindowError::NotCreated)?;
        self.platform.borrow_mut().make_context_current(id, context)?;
        Ok(())
    }

    /// Every raw platform event, before typed dispatch
    pub fn on_platform_event(&self) -> &CascadingDelegate<PlatformEvent> {
        &self.on_platform_event
    }

    /// Close requested for this window
    pub fn on_close(&self) -> &CascadingDelegate<()> {
        &self.on_close
    }

    /// Client area resized; the stored size is already updated
    pub fn on_resize(&self) -> &CascadingDelegate<IVec2> {
        &self.on_resize
    }

    /// Window moved; the stored position is already updated
    pub fn on_move(&self) -> &CascadingDelegate<IVec2> {
        &self.on_move
    }

    /// Fired with `true` on focus gain and `false` on focus loss
    pub fn on_focus(&self) -> &CascadingDelegate<bool> {
        &self.on_focus
    }

    /// Fired for key presses, repeats and releases
    pub fn on_keyboard(&self) -> &CascadingDelegate<KeyboardEvent> {
        &self.on_keyboard
    }

    /// Fired for mouse button presses and releases
    pub fn on_mouse_button(&self) -> &CascadingDelegate<MouseButtonEvent> {
        &self.on_mouse_button
    }

    /// Fired when the cursor moves
    pub fn on_mouse_motion(&self) -> &CascadingDelegate<MouseMotionEvent> {
        &self.on_mouse_motion
    }

    /// Fired for scroll wheel movement
    pub fn on_mouse_wheel(&self) -> &CascadingDelegate<MouseWheelEvent> {
        &self.on_mouse_wheel
    }

    /// Fired once per character of text input
    pub fn on_text_input(&self) -> &CascadingDelegate<char> {
        &self.on_text_input
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.destroy();
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("spec", &self.spec)
            .field("handle", &self.handle)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
