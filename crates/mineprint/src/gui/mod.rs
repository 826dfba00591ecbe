//! Immediate-mode GUI integration
//!
//! The shell drives a GUI library through [`GuiBackend`]: raw platform events go
//! in, and each frame is bracketed by `new_frame` / `render` with draw data
//! submitted after the renderer has cleared the back buffer. The library itself
//! (widgets, fonts, docking) lives behind the trait.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::foundation::time::FrameInfo;
use crate::platform::PlatformEvent;
use crate::render::device::GraphicsDevice;
use crate::render::window::Window;

/// GUI backend shared between the application and the window's event delegate
pub type SharedGui = Rc<RefCell<dyn GuiBackend>>;

/// GUI errors
#[derive(Error, Debug)]
pub enum GuiError {
    /// The backend could not attach to the window
    #[error("GUI initialisation failed: {0}")]
    InitializationFailed(String),

    /// `init` was called twice
    #[error("GUI is already initialised")]
    AlreadyInitialised,
}

/// Frame-bracketing interface of an immediate-mode GUI library
pub trait GuiBackend {
    /// Name for logging
    fn name(&self) -> &str;

    /// Attach to a created window and its current context
    fn init(&mut self, window: &Window) -> Result<(), GuiError>;

    /// Whether `init` succeeded and `shutdown` has not been called since
    fn is_initialised(&self) -> bool;

    /// Feed one raw platform event
    fn process_event(&mut self, event: &PlatformEvent);

    /// Start building a frame
    fn new_frame(&mut self, frame: &FrameInfo);

    /// Finish the frame and produce draw data
    fn render(&mut self);

    /// Submit the draw data produced by `render`
    fn render_draw_data(&mut self, device: &dyn GraphicsDevice);

    /// Update and draw detached viewports; may change the current context
    fn update_platform_windows(&mut self);

    /// Detach from the window. Safe to call repeatedly.
    fn shutdown(&mut self);
}

/// Backend that draws nothing
#[derive(Debug, Default)]
pub struct NullGui {
    initialised: bool,
}

impl NullGui {
    /// Create a GUI backend that draws nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in the shared handle the application expects
    pub fn shared() -> SharedGui {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl GuiBackend for NullGui {
    fn name(&self) -> &str {
        "null"
    }

    fn init(&mut self, window: &Window) -> Result<(), GuiError> {
        if self.initialised {
            return Err(GuiError::AlreadyInitialised);
        }
        if !window.is_created() {
            return Err(GuiError::InitializationFailed(
                "window has not been created".to_string(),
            ));
        }
        self.initialised = true;
        log::debug!("Null GUI attached to '{}'", window.title());
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn process_event(&mut self, _event: &PlatformEvent) {}

    fn new_frame(&mut self, _frame: &FrameInfo) {}

    fn render(&mut self) {}

    fn render_draw_data(&mut self, _device: &dyn GraphicsDevice) {}

    fn update_platform_windows(&mut self) {}

    fn shutdown(&mut self) {
        self.initialised = false;
    }
}
