//! # Mineprint
//!
//! An application shell pairing a native window, an OpenGL context and an
//! immediate-mode GUI behind one frame loop.
//!
//! ## Features
//!
//! - **Frame lifecycle**: input snapshot, event polling, GUI bracketing,
//!   clear and present in a fixed order
//! - **Delegates**: multicast and cascading (vetoable) subscriber lists
//! - **Platform layer**: GLFW for real windows, a headless platform for tests
//! - **Restartable**: shut down and bring a fresh application up in-process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use mineprint::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     loop {
//!         let platform: SharedPlatform = Rc::new(RefCell::new(GlfwPlatform::new()));
//!         let mut app = Application::new(ApplicationConfig::load()?, platform, NullGui::shared())?
//!             .with_logic(|ctx: &mut FrameContext<'_>| {
//!                 if ctx.input().is_key_down_this_frame(KeyCode::Escape) {
//!                     ctx.close();
//!                 }
//!             });
//!
//!         let result = app.initialise().and_then(|()| app.run());
//!         let outcome = app.shutdown();
//!         result?;
//!         if outcome == ShutdownOutcome::Exit {
//!             return Ok(());
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod events;
pub mod foundation;
pub mod gui;
pub mod input;
pub mod platform;
pub mod render;

mod application;

pub use application::{AppError, AppLogic, Application, FrameContext, ShutdownOutcome};

/// Common imports for shell users
pub mod prelude {
    pub use crate::{
        core::{ApplicationConfig, ApplicationSpecification, Config, SemVer},
        events::{CascadeOutcome, CascadingDelegate, DelegateHandle, MulticastDelegate, Propagation},
        foundation::{
            math::{ivec2, IVec2, Vec2},
            time::{FpsCounter, FrameInfo, Stopwatch, Timer},
        },
        gui::{GuiBackend, NullGui, SharedGui},
        input::{InputManager, KeyCode, Modifiers, MouseButton},
        platform::{GlfwPlatform, HeadlessPlatform, Platform, PlatformEvent, SharedPlatform},
        render::{Renderer, RendererSpecification, VSyncMode, Window, WindowSpecification},
        AppError, AppLogic, Application, FrameContext, ShutdownOutcome,
    };
}
