//! Window, graphics context and renderer
//!
//! - [`Window`] owns a native window plus its context and republishes native
//!   events through delegates.
//! - [`Renderer`] clears and presents the window's back buffer.
//! - [`GraphicsDevice`] is the small set of GL calls the renderer issues.

pub mod device;
pub mod gl_debug;
pub mod renderer;
pub mod window;

pub use device::{ClearMask, DeviceInfo, GlDevice, GraphicsDevice};
pub use gl_debug::{DebugMessage, DebugMessagePolicy, DebugSeverity, DebugSource, DebugType, DebugVerdict};
pub use renderer::{RenderError, Renderer, RendererSpecification};
pub use window::{VSyncMode, Window, WindowError, WindowSpecification};
