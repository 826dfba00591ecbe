//! Graphics device abstraction
//!
//! The renderer only needs a handful of GL calls. [`GraphicsDevice`] keeps them
//! behind a trait so the frame loop can run against a recording device when no
//! display is available.

#![allow(unsafe_code)]

use std::ffi::c_void;

use bitflags::bitflags;
use glow::HasContext;

use crate::render::gl_debug::{DebugMessage, DebugMessagePolicy};

bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        /// Colour buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// Driver identification strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Version string, e.g. "4.5.0 NVIDIA 550.54"
    pub version: String,
    /// Vendor string
    pub vendor: String,
    /// Renderer string
    pub renderer: String,
}

/// Minimal set of graphics calls used by the renderer.
///
/// Methods take `&self`; implementations use interior mutability where needed
/// so the device can be shared with delegate subscribers.
pub trait GraphicsDevice {
    /// Driver identification
    fn info(&self) -> DeviceInfo;

    /// Set the colour used by colour clears
    fn set_clear_color(&self, color: [f32; 4]);

    /// Clear the selected buffers
    fn clear(&self, mask: ClearMask);

    /// Set the viewport rectangle
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32);
}

/// OpenGL device backed by `glow`
pub struct GlDevice {
    gl: glow::Context,
}

impl GlDevice {
    /// Load GL function pointers through `loader`.
    ///
    /// # Safety
    /// The context the loader belongs to must be current on the calling thread,
    /// and must stay current whenever the device is used.
    pub unsafe fn load<F>(loader: F, debug: Option<DebugMessagePolicy>) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let mut gl = glow::Context::from_loader_function(loader);

        if let Some(policy) = debug {
            if gl.supports_debug() {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(move |source, kind, id, severity, text| {
                    policy.handle(&DebugMessage::new(source, kind, id, severity, text));
                });
                log::debug!("OpenGL debug output enabled");
            } else {
                log::warn!("OpenGL debug output requested but not supported by this context");
            }
        }

        Self { gl }
    }
}

impl GraphicsDevice for GlDevice {
    fn info(&self) -> DeviceInfo {
        unsafe {
            DeviceInfo {
                version: self.gl.get_parameter_string(glow::VERSION),
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
            }
        }
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) }
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.contains(ClearMask::COLOR) {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.contains(ClearMask::DEPTH) {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        if mask.contains(ClearMask::STENCIL) {
            bits |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }
}
