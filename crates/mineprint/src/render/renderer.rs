//! Clear-and-present renderer
//!
//! The renderer loads a [`GraphicsDevice`] for a window's context, keeps the
//! viewport in sync with the window size, clears the back buffer every frame
//! and presents it.

use std::rc::Rc;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{DelegateHandle, Propagation};
use crate::foundation::math::IVec2;
use crate::platform::{ContextAttributes, PlatformError, SharedPlatform, WindowId};
use crate::render::device::{ClearMask, GraphicsDevice};
use crate::render::gl_debug::DebugMessagePolicy;
use crate::render::window::{Window, WindowError};

static DRIVER_INFO: Once = Once::new();

/// Renderer errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// `init` has not been called
    #[error("Renderer is not initialised")]
    NotInitialised,

    /// `init` was called twice
    #[error("Renderer is already initialised")]
    AlreadyInitialised,

    /// The target window has no native resources
    #[error("Renderer needs a created window")]
    WindowNotCreated,

    /// Window call failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Platform call failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSpecification {
    /// RGBA colour the back buffer is cleared to
    pub clear_color: [f32; 4],
    /// Context requested together with the window
    pub context: ContextAttributes,
    /// Route driver debug messages through `debug_policy`
    pub gl_debug: bool,
    /// Filter for driver debug messages
    pub debug_policy: DebugMessagePolicy,
}

impl Default for RendererSpecification {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.1, 1.0],
            context: ContextAttributes::default(),
            gl_debug: cfg!(debug_assertions),
            debug_policy: DebugMessagePolicy::default(),
        }
    }
}

struct Target {
    window: WindowId,
    platform: SharedPlatform,
    device: Rc<dyn GraphicsDevice>,
    resize_handle: DelegateHandle,
}

/// Renderer bound to one window
pub struct Renderer {
    spec: RendererSpecification,
    target: Option<Target>,
    frame_index: u64,
}

impl Renderer {
    /// Create an uninitialised renderer; call `init` once the window exists
    pub fn new(spec: RendererSpecification) -> Self {
        Self {
            spec,
            target: None,
            frame_index: 0,
        }
    }

    /// Load the graphics device for `window` and follow its size.
    pub fn init(&mut self, window: &Window) -> Result<(), RenderError> {
        if self.target.is_some() {
            return Err(RenderError::AlreadyInitialised);
        }
        let id = window.id().ok_or(RenderError::WindowNotCreated)?;
        window.make_context_current()?;

        let debug = self.spec.gl_debug.then(|| self.spec.debug_policy.clone());
        let platform = window.platform().clone();
        let device = platform.borrow_mut().load_graphics_device(id, debug)?;

        DRIVER_INFO.call_once(|| {
            let info = device.info();
            log::info!("OpenGL Info:");
            log::info!("  Version: {}", info.version);
            log::info!("  Vendor: {}", info.vendor);
            log::info!("  Renderer: {}", info.renderer);
        });

        device.set_clear_color(self.spec.clear_color);
        let size = window.size();
        device.set_viewport(0, 0, size.x, size.y);

        let viewport = device.clone();
        let resize_handle = window.on_resize().bind(move |size: &IVec2| {
            viewport.set_viewport(0, 0, size.x, size.y);
            Propagation::Continue
        });

        self.target = Some(Target {
            window: id,
            platform,
            device,
            resize_handle,
        });
        self.frame_index = 0;
        log::debug!("Renderer initialised");
        Ok(())
    }

    /// True between `init` and `shutdown`
    pub fn is_initialised(&self) -> bool {
        self.target.is_some()
    }

    /// Clear the back buffer
    pub fn render(&self) -> Result<(), RenderError> {
        let target = self.target.as_ref().ok_or(RenderError::NotInitialised)?;
        target.device.clear(ClearMask::COLOR);
        Ok(())
    }

    /// Swap buffers and advance the frame index
    pub fn present(&mut self) -> Result<(), RenderError> {
        let target = self.target.as_ref().ok_or(RenderError::NotInitialised)?;
        target.platform.borrow_mut().swap_buffers(target.window)?;
        self.frame_index += 1;
        Ok(())
    }

    /// Number of frames presented since `init`
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Colour used for the next clear
    pub fn clear_color(&self) -> [f32; 4] {
        self.spec.clear_color
    }

    /// Change the clear colour, applied to the device immediately when initialised
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.spec.clear_color = color;
        if let Some(target) = &self.target {
            target.device.set_clear_color(color);
        }
    }

    /// Current renderer settings
    pub fn specification(&self) -> &RendererSpecification {
        &self.spec
    }

    /// Graphics device, once initialised
    pub fn device(&self) -> Option<&Rc<dyn GraphicsDevice>> {
        self.target.as_ref().map(|target| &target.device)
    }

    /// Stop following `window` and release the device. Safe to call repeatedly.
    pub fn shutdown(&mut self, window: &Window) {
        if let Some(target) = self.target.take() {
            window.on_resize().unbind(target.resize_handle);
            log::debug!("Renderer shut down after {} frames", self.frame_index);
        }
    }
}
