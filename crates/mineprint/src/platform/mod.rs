//! Platform windowing layer
//!
//! The [`Platform`] trait is the narrow interface the rest of the crate uses to
//! talk to the native window system: window and GL context lifetime, the event
//! queue, window properties and buffer swapping. Native windows are identified
//! by [`WindowId`] handles; each implementation keeps its own table from handle
//! to native window and tags every [`PlatformEvent`] with the handle it came
//! from.
//!
//! - [`GlfwPlatform`] drives real windows through GLFW.
//! - [`HeadlessPlatform`] is a scripted, in-memory implementation for tests and
//!   CI machines without a display.

pub mod glfw_backend;
pub mod headless;

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use crate::foundation::math::{IVec2, Vec2};
use crate::input::{KeyCode, Modifiers, MouseButton};
use crate::render::device::GraphicsDevice;
use crate::render::gl_debug::DebugMessagePolicy;
use crate::render::window::WindowSpecification;

pub use self::glfw_backend::GlfwPlatform;
pub use self::headless::{CallTrace, GraphicsCommand, HeadlessPlatform, HeadlessWindow, RecordingDevice};

new_key_type! {
    /// Handle to a native window owned by a [`Platform`]
    pub struct WindowId;
    /// Handle to a graphics context owned by a [`Platform`]
    pub struct ContextId;
}

/// Platform shared between the application, its window and its renderer
pub type SharedPlatform = Rc<RefCell<dyn Platform>>;

/// Platform layer errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform has not been initialised (or was terminated)
    #[error("Platform is not initialised")]
    NotInitialized,

    /// Platform initialisation failed
    #[error("Platform initialisation failed: {0}")]
    InitializationFailed(String),

    /// Native window creation failed
    #[error("Window creation failed: {0}")]
    WindowCreationFailed(String),

    /// The handle does not refer to a live window
    #[error("Unknown window handle {0:?}")]
    UnknownWindow(WindowId),

    /// The handle does not refer to a live context
    #[error("Unknown graphics context handle {0:?}")]
    UnknownContext(ContextId),

    /// Graphics context creation failed
    #[error("Graphics context creation failed: {0}")]
    ContextCreationFailed(String),

    /// Loading graphics function pointers failed
    #[error("Failed to load graphics functions: {0}")]
    GraphicsLoadFailed(String),

    /// No monitor is available for centering or fullscreen
    #[error("No monitor available")]
    NoMonitor,

    /// A size or position was outside what the platform accepts
    #[error("Invalid window geometry: {0}")]
    InvalidGeometry(String),
}

/// Buffer swap synchronisation requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapInterval {
    /// Swap immediately
    Immediate,
    /// Wait for vertical blank
    Synchronized,
    /// Wait for vertical blank unless the frame is late
    Adaptive,
}

/// Position and client size of a window on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    /// Top-left corner
    pub position: IVec2,
    /// Client area size
    pub size: IVec2,
}

/// OpenGL context profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlProfile {
    /// Core profile
    Core,
    /// Compatibility profile
    Compatibility,
}

/// Attributes of the graphics context created with a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAttributes {
    /// Double-buffered framebuffer
    pub double_buffer: bool,
    /// Requested OpenGL major version
    pub major_version: u32,
    /// Requested OpenGL minor version
    pub minor_version: u32,
    /// Requested profile
    pub profile: GlProfile,
    /// Depth buffer bits
    pub depth_bits: u32,
    /// Stencil buffer bits
    pub stencil_bits: u32,
    /// Request a debug context
    pub debug: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            double_buffer: true,
            major_version: 4,
            minor_version: 5,
            profile: GlProfile::Core,
            depth_bits: 24,
            stencil_bits: 8,
            debug: cfg!(debug_assertions),
        }
    }
}

/// Key press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Window the event belongs to
    pub window: WindowId,
    /// Physical key
    pub key: KeyCode,
    /// Platform-specific scancode
    pub scancode: i32,
    /// True for press and repeat, false for release
    pub pressed: bool,
    /// True if generated by key auto-repeat
    pub repeat: bool,
    /// Modifier keys held
    pub modifiers: Modifiers,
}

/// Mouse button press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    /// Window the event belongs to
    pub window: WindowId,
    /// Button
    pub button: MouseButton,
    /// True for press, false for release
    pub pressed: bool,
    /// Modifier keys held
    pub modifiers: Modifiers,
}

/// Cursor movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMotionEvent {
    /// Window the event belongs to
    pub window: WindowId,
    /// Cursor x in window coordinates
    pub x: f32,
    /// Cursor y in window coordinates
    pub y: f32,
}

/// Scroll wheel movement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseWheelEvent {
    /// Window the event belongs to
    pub window: WindowId,
    /// Horizontal scroll
    pub delta_x: f32,
    /// Vertical scroll
    pub delta_y: f32,
}

/// Raw event drained from the platform queue
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The user asked to close the window
    CloseRequested {
        /// Window the event belongs to
        window: WindowId,
    },
    /// The window client area changed size
    Resized {
        /// Window the event belongs to
        window: WindowId,
        /// New size in screen coordinates
        size: IVec2,
    },
    /// The window moved
    Moved {
        /// Window the event belongs to
        window: WindowId,
        /// New top-left position
        position: IVec2,
    },
    /// The window gained or lost input focus
    FocusChanged {
        /// Window the event belongs to
        window: WindowId,
        /// Whether the window now has focus
        focused: bool,
    },
    /// Key press or release
    Keyboard(KeyboardEvent),
    /// Mouse button press or release
    MouseButton(MouseButtonEvent),
    /// Cursor movement
    MouseMotion(MouseMotionEvent),
    /// Scroll wheel movement
    MouseWheel(MouseWheelEvent),
    /// Unicode text input
    TextInput {
        /// Window the event belongs to
        window: WindowId,
        /// Character entered
        character: char,
    },
}

impl PlatformEvent {
    /// Window the event belongs to
    pub fn window(&self) -> WindowId {
        match self {
            Self::CloseRequested { window }
            | Self::Resized { window, .. }
            | Self::Moved { window, .. }
            | Self::FocusChanged { window, .. }
            | Self::TextInput { window, .. } => *window,
            Self::Keyboard(event) => event.window,
            Self::MouseButton(event) => event.window,
            Self::MouseMotion(event) => event.window,
            Self::MouseWheel(event) => event.window,
        }
    }
}

/// Native windowing layer used by [`crate::render::Window`] and [`crate::render::Renderer`].
///
/// All calls happen on the thread that owns the window. Property setters
/// return an error instead of panicking when the handle is stale.
pub trait Platform {
    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;

    /// Initialise the native layer
    fn init(&mut self) -> Result<(), PlatformError>;

    /// Whether `init` succeeded and `terminate` has not been called since
    fn is_initialized(&self) -> bool;

    /// Destroy every remaining window and shut the native layer down
    fn terminate(&mut self);

    /// Create a hidden native window sized per `spec`, prepared for a context with `attributes`
    fn create_window(
        &mut self,
        spec: &WindowSpecification,
        attributes: &ContextAttributes,
    ) -> Result<WindowId, PlatformError>;

    /// Destroy a native window; unknown handles are ignored
    fn destroy_window(&mut self, window: WindowId);

    /// Create the graphics context for a window
    fn create_context(&mut self, window: WindowId) -> Result<ContextId, PlatformError>;

    /// Destroy a graphics context; unknown handles are ignored
    fn destroy_context(&mut self, context: ContextId);

    /// Make `context` current on the calling thread, drawing to `window`
    fn make_context_current(&mut self, window: WindowId, context: ContextId) -> Result<(), PlatformError>;

    /// Window and context that are current on the calling thread
    fn current_context(&self) -> Option<(WindowId, ContextId)>;

    /// Apply a swap interval to the current context; false if the platform rejected it
    fn set_swap_interval(&mut self, interval: SwapInterval) -> bool;

    /// Present the back buffer of `window`
    fn swap_buffers(&mut self, window: WindowId) -> Result<(), PlatformError>;

    /// Drain every queued event without blocking
    fn poll_events(&mut self) -> Vec<PlatformEvent>;

    /// Set the window title
    fn set_window_title(&mut self, window: WindowId, title: &str) -> Result<(), PlatformError>;

    /// Set the client area size
    fn set_window_size(&mut self, window: WindowId, size: IVec2) -> Result<(), PlatformError>;

    /// Set size limits; a non-positive extent means "no limit"
    fn set_window_size_limits(&mut self, window: WindowId, min: IVec2, max: IVec2) -> Result<(), PlatformError>;

    /// Move the window
    fn set_window_position(&mut self, window: WindowId, position: IVec2) -> Result<(), PlatformError>;

    /// Centre the window on the primary monitor, returning its new position
    fn center_window(&mut self, window: WindowId) -> Result<IVec2, PlatformError>;

    /// Enter or leave fullscreen, returning the rectangle now occupied.
    ///
    /// `windowed` is where the window goes when leaving fullscreen.
    fn set_window_fullscreen(
        &mut self,
        window: WindowId,
        fullscreen: bool,
        windowed: WindowRect,
    ) -> Result<WindowRect, PlatformError>;

    /// Allow or forbid user resizing
    fn set_window_resizable(&mut self, window: WindowId, resizable: bool) -> Result<(), PlatformError>;

    /// Show or hide the window
    fn set_window_visible(&mut self, window: WindowId, visible: bool) -> Result<(), PlatformError>;

    /// Capture the cursor for relative motion, or release it
    fn set_cursor_locked(&mut self, window: WindowId, locked: bool) -> Result<(), PlatformError>;

    /// Whether the cursor is captured by `window`
    fn is_cursor_locked(&self, window: WindowId) -> bool;

    /// Move the cursor inside the window
    fn warp_cursor(&mut self, window: WindowId, position: Vec2) -> Result<(), PlatformError>;

    /// Load graphics functions for the window's context and wrap them in a device.
    ///
    /// With a `debug` policy the device routes driver debug messages through it.
    fn load_graphics_device(
        &mut self,
        window: WindowId,
        debug: Option<DebugMessagePolicy>,
    ) -> Result<Rc<dyn GraphicsDevice>, PlatformError>;

    /// Show a blocking error dialog
    fn show_message_box(&self, title: &str, message: &str, parent: Option<WindowId>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_event_window_accessor() {
        let mut ids = SlotMap::<WindowId, ()>::with_key();
        let id = ids.insert(());

        let events = [
            PlatformEvent::CloseRequested { window: id },
            PlatformEvent::Resized {
                window: id,
                size: IVec2::new(1, 1),
            },
            PlatformEvent::MouseWheel(MouseWheelEvent {
                window: id,
                delta_x: 0.0,
                delta_y: 1.0,
            }),
        ];
        assert!(events.iter().all(|e| e.window() == id));
    }

    #[test]
    fn test_default_context_attributes() {
        let attributes = ContextAttributes::default();
        assert!(attributes.double_buffer);
        assert_eq!((attributes.major_version, attributes.minor_version), (4, 5));
        assert_eq!(attributes.profile, GlProfile::Core);
        assert_eq!((attributes.depth_bits, attributes.stencil_bits), (24, 8));
    }
}
